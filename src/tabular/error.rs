use thiserror::Error;

use crate::experiment::error::ExperimentError;

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("Failed to read or write file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
    #[error("Failed to read workbook: {0}")]
    Excel(#[from] calamine::Error),
    #[error("Sheet '{0}' has no header row")]
    MissingHeader(String),
    #[error("Workbook has no sheets")]
    NoSheets,
    #[error(transparent)]
    Table(#[from] ExperimentError),
}
