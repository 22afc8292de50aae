use thiserror::Error;

use super::store::ExperimentId;

/// Errors raised while validating or importing experimental data.
///
/// An experiment that fails validation is never added to a store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExperimentError {
    #[error("Species do not match the model (missing: {missing:?}, unknown: {extra:?})")]
    SpeciesMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
    #[error("No starting concentration for species '{0}'")]
    MissingStartingConcentration(String),
    #[error("Time and concentration series have different lengths ({times} vs {values})")]
    LengthMismatch { times: usize, values: usize },
    #[error("Time series is empty")]
    EmptySeries,
    #[error("Invalid time point {0}; times must be finite and non-negative")]
    InvalidTime(f64),
    #[error("Invalid value {value} for species '{species}'")]
    InvalidValue { species: String, value: f64 },
    #[error("Species '{0}' holds a rate series that has not been expanded into experiments")]
    UnexpandedSeries(String),
    #[error("Species '{0}' is not part of the model")]
    UnknownSpecies(String),
    #[error("Column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),
    #[error("No time column assigned")]
    MissingTimeColumn,
    #[error("Column '{column}' has {found} entries, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Row {index} is out of range for a series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No rates or concentrations assigned")]
    NoData,
    #[error("Experiment {0} does not exist")]
    UnknownExperiment(ExperimentId),
}

impl ExperimentError {
    /// Attaches a species name to errors raised before the species was known
    pub(crate) fn for_species(self, species: &str) -> Self {
        match self {
            ExperimentError::MissingStartingConcentration(_) => {
                ExperimentError::MissingStartingConcentration(species.to_string())
            }
            ExperimentError::InvalidValue { value, .. } => ExperimentError::InvalidValue {
                species: species.to_string(),
                value,
            },
            other => other,
        }
    }
}
