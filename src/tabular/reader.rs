//! Decoding of delimited text files and spreadsheets into [`DataTable`]s.
//!
//! Cells that are empty or not numeric become `NaN`; the importers reject such
//! values when they end up in an observation.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use log::debug;
use polars::prelude::*;

use crate::experiment::table::DataTable;

use super::error::TabularError;

/// Reads a delimited text file with a header row.
///
/// # Arguments
///
/// * `path` - The path to the file
/// * `delimiter` - Field separator, e.g. `b','` or `b'\t'`
pub fn read_table(path: impl Into<PathBuf>, delimiter: u8) -> Result<DataTable, TabularError> {
    let path = path.into();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.clone()))?
        .finish()?;

    debug!("Read {:?} from {}", df.shape(), path.display());
    dataframe_to_table(&df)
}

/// Reads every worksheet of a workbook, keeping the sheet order.
///
/// The first row of each sheet holds the column names.
pub fn read_excel(path: impl Into<PathBuf>) -> Result<Vec<(String, DataTable)>, TabularError> {
    let mut workbook = open_workbook_auto(path.into())?;

    let mut tables = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet)?;
        let table = sheet_to_table(&sheet, &range)?;
        tables.push((sheet, table));
    }

    Ok(tables)
}

/// Reads a table, choosing the decoder from the file extension.
///
/// `xlsx`, `xls`, `xlsm` and `ods` files yield their first sheet, `tsv` and `tab`
/// are read as tab separated and everything else as comma separated.
pub fn read_file(path: impl AsRef<Path>) -> Result<DataTable, TabularError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xls" | "xlsm" | "ods" => read_excel(path)?
            .into_iter()
            .next()
            .map(|(_, table)| table)
            .ok_or(TabularError::NoSheets),
        "tsv" | "tab" => read_table(path, b'\t'),
        _ => read_table(path, b','),
    }
}

fn dataframe_to_table(df: &DataFrame) -> Result<DataTable, TabularError> {
    let mut table = DataTable::new();
    for series in df.get_columns() {
        let values = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        table.insert(series.name().to_string(), values)?;
    }
    Ok(table)
}

fn sheet_to_table(sheet: &str, range: &Range<Data>) -> Result<DataTable, TabularError> {
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| TabularError::MissingHeader(sheet.to_string()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut columns = vec![Vec::new(); header.len()];
    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell_value(cell));
        }
    }

    Ok(DataTable::from_columns(header.into_iter().zip(columns))?)
}

fn cell_value(cell: &Data) -> f64 {
    match cell {
        Data::Float(value) => *value,
        Data::Int(value) => *value as f64,
        Data::String(text) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_read_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "time,A,B").unwrap();
        writeln!(file, "0,1.0,0").unwrap();
        writeln!(file, "1,0.5,0.5").unwrap();

        let table = read_file(file.path()).unwrap();
        assert_eq!(table.column_names(), &["time", "A", "B"]);
        assert_eq!(table.column("A").unwrap(), &[1.0, 0.5]);
        assert_eq!(table.column("time").unwrap(), &[0.0, 1.0]);
    }

    #[test]
    fn test_read_tsv_with_gaps() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "time\trate").unwrap();
        writeln!(file, "0\t").unwrap();
        writeln!(file, "1\t2.5").unwrap();

        let table = read_file(file.path()).unwrap();
        let rates = table.column("rate").unwrap();
        assert!(rates[0].is_nan());
        assert_eq!(rates[1], 2.5);
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Int(3)), 3.0);
        assert_eq!(cell_value(&Data::String(" 1.5 ".into())), 1.5);
        assert!(cell_value(&Data::Empty).is_nan());
    }
}
