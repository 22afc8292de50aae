//! Export of simulation results as tables.
//!
//! The frame holds a `time` column, one concentration column per species and one
//! `<species>_rate` column per species, in model order.

use std::fs::File;
use std::path::PathBuf;

use log::info;
use polars::prelude::*;

use crate::simulation::result::SimulationResult;

use super::error::TabularError;

impl TryFrom<&SimulationResult> for DataFrame {
    type Error = TabularError;

    fn try_from(result: &SimulationResult) -> Result<Self, Self::Error> {
        let mut columns = vec![Series::new("time", result.times.clone())];

        for (i, species) in result.species.iter().enumerate() {
            let values: Vec<f64> = result.concentrations.iter().map(|row| row[i]).collect();
            columns.push(Series::new(species.as_str(), values));
        }

        for (i, species) in result.species.iter().enumerate() {
            let values: Vec<f64> = result.rates.iter().map(|row| row[i]).collect();
            columns.push(Series::new(format!("{}_rate", species).as_str(), values));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Writes a simulation result as comma separated text with a header row
pub fn write_result(path: impl Into<PathBuf>, result: &SimulationResult) -> Result<(), TabularError> {
    let path = path.into();
    let mut df = DataFrame::try_from(result)?;
    let mut file = File::create(&path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::model::Model;
    use crate::simulation::runner::simulate;
    use crate::simulation::setup::SimulationSetup;
    use crate::tabular::reader::read_table;
    use approx::assert_relative_eq;
    use peroxide::fuga::RK4;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_and_read_back() {
        let model = Model::from_definition("A <-> B").unwrap();
        let result = simulate(
            &model,
            &[1.0, 0.0],
            &[0.0, 0.5, 1.0],
            &[1.0, 1.0],
            &SimulationSetup::default(),
            RK4,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.csv");
        write_result(&path, &result).unwrap();

        let table = read_table(&path, b',').unwrap();
        assert_eq!(table.column_names(), &["time", "A", "B", "A_rate", "B_rate"]);
        assert_eq!(table.n_rows(), 3);
        assert_relative_eq!(
            table.column("B").unwrap()[2],
            result.concentrations[2][1],
            epsilon = 1e-9
        );
    }
}
