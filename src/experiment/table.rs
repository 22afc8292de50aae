//! Column tables fed to the importers

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::ExperimentError;

/// In-memory column table: column name to values, keeping column order.
///
/// This is the shape the importers consume. Decoding files into it is the job of the
/// `tabular` module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, values)` pairs
    pub fn from_columns<S, I>(columns: I) -> Result<Self, ExperimentError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<f64>)>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert(name, values)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), ExperimentError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(ExperimentError::DuplicateColumn(name));
        }

        self.names.push(name.clone());
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&[f64], ExperimentError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ExperimentError::UnknownColumn(name.to_string()))
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn n_columns(&self) -> usize {
        self.names.len()
    }

    /// Length of the longest column
    pub fn n_rows(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_and_lookup() {
        let table =
            DataTable::from_columns([("time", vec![0.0, 1.0]), ("P", vec![0.0, 0.4])]).unwrap();

        assert_eq!(table.column_names(), &["time", "P"]);
        assert_eq!(table.column("P").unwrap(), &[0.0, 0.4]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.column("S").unwrap_err(),
            ExperimentError::UnknownColumn("S".into())
        );
    }

    #[test]
    fn test_duplicate_column() {
        let err = DataTable::from_columns([("t", vec![]), ("t", vec![])]).unwrap_err();
        assert_eq!(err, ExperimentError::DuplicateColumn("t".into()));
    }
}
