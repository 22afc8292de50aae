use thiserror::Error;

use crate::simulation::error::SimulationError;

/// Errors raised while setting up or running a fit.
///
/// A failed fit never produces a [`Solution`](super::solution::Solution); earlier
/// solutions are unaffected.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Expected {expected} parameter values, got {found}")]
    ParameterCountMismatch { expected: usize, found: usize },
    #[error("No experiments to fit against")]
    NoExperiments,
    #[error("Experiment species {found:?} do not match the model species {expected:?}")]
    IncompatibleExperiment {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Time point {0} was not simulated")]
    MissingTimePoint(f64),
    #[error("Solver terminated prematurely: {0}")]
    Terminated(String),
    #[error("Objective is not finite at the best point found")]
    NonFiniteObjective,
    #[error("Maximum number of objective evaluations reached")]
    EvaluationLimit,
    #[error("Unknown solver method '{0}', expected 'simplex' or 'anneal'")]
    UnknownMethod(String),
    #[error("Invalid initial guess '{0}', expected 'ones', 'random[:seed]' or comma separated values")]
    InvalidGuess(String),
    #[error("Invalid solver option: {0}")]
    InvalidOptions(String),
    #[error("Solver worker stopped without a result")]
    WorkerDisconnected,
    #[error("Failed to simulate with given parameters")]
    Simulation(#[from] SimulationError),
}
