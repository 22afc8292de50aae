//! Simulation Error Module
//!
//! Errors raised while integrating a model. Numerical blow-ups (`inf`/`NaN` states)
//! are not errors; they are reported through the values themselves so that an
//! optimizer can penalise the offending parameter region.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("No time points given")]
    EmptyTimes,
    #[error("Time points must be finite, non-negative and ascending (offending index {0})")]
    InvalidTimes(usize),
    #[error("Expected {expected} initial values, got {found}")]
    InitialValueMismatch { expected: usize, found: usize },
    #[error("Expected {expected} parameter values, got {found}")]
    ParameterMismatch { expected: usize, found: usize },
    #[error("Expected {expected} species values, got {found}")]
    StateMismatch { expected: usize, found: usize },
    #[error("Reaction {0} does not exist")]
    UnknownReaction(usize),
    #[error("Integration step size must be positive, got {0}")]
    InvalidStepSize(f64),
    #[error("Integration failed: {0}")]
    IntegrationError(String),
    #[error("Species '{0}' is not part of the simulation")]
    UnknownSpecies(String),
}

impl From<argmin_math::Error> for SimulationError {
    fn from(err: argmin_math::Error) -> Self {
        SimulationError::IntegrationError(err.to_string())
    }
}
