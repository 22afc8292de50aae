//! Beaker Kinetics Library
//!
//! This library compiles reaction networks written as text into ODE models and fits
//! their rate constants to experimental data:
//! - Parsing reaction definitions with optional rate-constant overrides
//! - Simulating concentration and rate trajectories
//! - Importing experiments from column tables
//! - Least-squares parameter fitting with simplex or annealing minimizers
//! - Saving and restoring working sessions

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::experiment::error::ExperimentError;
    pub use crate::experiment::experiment::{Experiment, ObservationMap};
    pub use crate::experiment::importer::{ConcentrationImporter, RateImporter};
    pub use crate::experiment::observation::{
        Observation, RateMeasurement, RateSeries, TimeSeries, INITIAL_RATE_TIME,
    };
    pub use crate::experiment::store::{ExperimentId, ExperimentStore};
    pub use crate::experiment::table::DataTable;
    pub use crate::expression::ParameterId;
    pub use crate::io::*;
    pub use crate::model::error::DefinitionError;
    pub use crate::model::model::Model;
    pub use crate::optim::error::SolverError;
    pub use crate::optim::initials::InitialGuess;
    pub use crate::optim::observer::{CallbackObserver, Progress};
    pub use crate::optim::optimizers::*;
    pub use crate::optim::problem::{Problem, ProblemBuilder};
    pub use crate::optim::runner::{multi_start, solve, spawn_solve, SolveHandle};
    pub use crate::optim::solution::{Solution, SolutionStatus};
    pub use crate::session::{Session, SessionError, SessionSnapshot};
    pub use crate::simulation::error::SimulationError;
    pub use crate::simulation::result::SimulationResult;
    pub use crate::simulation::runner::simulate;
    pub use crate::simulation::setup::{SimulationSetup, SimulationSetupBuilder};

    #[cfg(feature = "tabular")]
    pub use crate::tabular::error::TabularError;
    #[cfg(feature = "tabular")]
    pub use crate::tabular::reader::*;
    #[cfg(feature = "tabular")]
    pub use crate::tabular::writer::*;
}

/// Arithmetic over named parameters used in rate-constant overrides
pub mod expression;

/// Reaction definitions and the compiled ODE model
pub mod model {
    /// Definition errors with line numbers
    pub mod error;
    /// The compiled model
    pub mod model;
    /// Parameter enumeration
    pub mod parameters;
    /// Line parser for reaction definitions
    pub mod parser;
    /// Compiled rate laws
    pub mod rates;
    /// Reactions and their species terms
    pub mod reaction;
}

/// Forward simulation of a model
pub mod simulation {
    pub use peroxide::fuga::{ODEIntegrator, RK4, RK5};

    /// Error types for simulation failures
    pub mod error;
    /// Simulation result data structures
    pub mod result;
    /// Integration driver
    pub mod runner;
    /// Simulation setup and configuration
    pub mod setup;
    /// ODE right-hand side
    pub mod system;
}

/// Experimental observations and their import
pub mod experiment {
    pub mod error;
    pub mod experiment;
    pub mod importer;
    pub mod observation;
    pub mod store;
    pub mod table;
}

/// Least-squares parameter fitting
pub mod optim {
    use argmin_math as _;

    pub mod error;
    pub mod initials;
    pub(crate) mod objective;
    pub mod observer;
    pub mod problem;
    pub mod runner;
    pub mod solution;

    pub mod optimizers {
        pub use crate::optim::optimizers::anneal::*;
        pub use crate::optim::optimizers::optimizer::*;
        pub use crate::optim::optimizers::simplex::*;
        pub mod anneal;
        pub mod optimizer;
        pub mod simplex;
        pub(crate) mod utils;
    }
}

/// Working sessions
pub mod session;

/// Session persistence
pub mod io;

/// Tabular data handling
#[cfg(feature = "tabular")]
pub mod tabular {
    pub mod error;
    /// Reading CSV, TSV and spreadsheet files
    pub mod reader;
    /// Writing simulation results
    pub mod writer;
}
