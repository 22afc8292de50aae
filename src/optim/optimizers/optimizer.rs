//! The optimizer interface and the named solver methods.

use std::fmt::{self, Display};
use std::str::FromStr;

use peroxide::fuga::ODEIntegrator;
use serde::{Deserialize, Serialize};

use crate::optim::error::SolverError;
use crate::optim::observer::CallbackObserver;
use crate::optim::problem::Problem;
use crate::optim::solution::Solution;

use super::anneal::AnnealingBuilder;
use super::simplex::NelderMeadBuilder;

/// Trait defining the interface for optimization algorithms.
pub trait Optimizer<S: ODEIntegrator + Copy> {
    /// Minimises the problem's objective starting from `initial_guess`.
    ///
    /// # Arguments
    /// * `problem` - The fitting problem
    /// * `initial_guess` - Starting parameter values, in parameter order
    /// * `observer` - Optional progress callback
    ///
    /// # Returns
    /// * `Result<Solution, SolverError>` - The solution or the reason the fit failed
    fn optimize(
        &self,
        problem: &Problem<S>,
        initial_guess: &[f64],
        observer: Option<CallbackObserver>,
    ) -> Result<Solution, SolverError>;

    /// The method implemented by this optimizer
    fn method(&self) -> Method;
}

/// Minimizers selectable by name
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Derivative-free Nelder-Mead simplex search
    #[default]
    Simplex,
    /// Simulated annealing
    Anneal,
}

impl Method {
    /// An optimizer for this method with default settings
    pub fn optimizer<S: ODEIntegrator + Copy>(&self) -> Box<dyn Optimizer<S> + Send + Sync> {
        match self {
            Method::Simplex => Box::new(NelderMeadBuilder::default().build()),
            Method::Anneal => Box::new(AnnealingBuilder::default().build()),
        }
    }
}

impl FromStr for Method {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simplex" | "fmin" | "nelder-mead" => Ok(Method::Simplex),
            "anneal" => Ok(Method::Anneal),
            _ => Err(SolverError::UnknownMethod(s.to_string())),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Simplex => write!(f, "simplex"),
            Method::Anneal => write!(f, "anneal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("simplex".parse::<Method>().unwrap(), Method::Simplex);
        assert_eq!("Anneal".parse::<Method>().unwrap(), Method::Anneal);
        assert!(matches!(
            "bfgs".parse::<Method>(),
            Err(SolverError::UnknownMethod(_))
        ));
    }
}
