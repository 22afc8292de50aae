//! Fit results

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::optimizers::optimizer::Method;

/// Why a fit stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionStatus {
    Converged,
    MaxIterationsReached,
    MaxEvaluationsReached,
    TargetCostReached,
    Timeout,
    Stopped(String),
}

impl SolutionStatus {
    /// Whether the minimizer met its convergence criterion
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            SolutionStatus::Converged | SolutionStatus::TargetCostReached
        )
    }
}

impl Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Converged => write!(f, "converged"),
            SolutionStatus::MaxIterationsReached => write!(f, "maximum iterations reached"),
            SolutionStatus::MaxEvaluationsReached => write!(f, "maximum evaluations reached"),
            SolutionStatus::TargetCostReached => write!(f, "target objective reached"),
            SolutionStatus::Timeout => write!(f, "timed out"),
            SolutionStatus::Stopped(reason) => write!(f, "stopped: {}", reason),
        }
    }
}

/// Output of one fit.
///
/// Parameter values are reported after reflection, so they are never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub parameter_names: Vec<String>,
    pub parameters: Vec<f64>,
    pub objective: f64,
    pub iterations: u64,
    pub evaluations: u64,
    pub status: SolutionStatus,
    pub method: Method,
    pub initial_guess: Vec<f64>,
}

/// One row of a rendered solution
#[derive(Debug, Clone, Tabled)]
pub struct ParameterRow {
    #[tabled(rename = "Parameter")]
    pub name: String,
    #[tabled(rename = "Initial")]
    pub initial: f64,
    #[tabled(rename = "Fitted")]
    pub value: f64,
}

impl Solution {
    /// Value of a parameter by name
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameter_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.parameters[i])
    }

    pub fn rows(&self) -> Vec<ParameterRow> {
        self.parameter_names
            .iter()
            .zip(&self.parameters)
            .zip(&self.initial_guess)
            .map(|((name, value), initial)| ParameterRow {
                name: name.clone(),
                initial: *initial,
                value: *value,
            })
            .collect()
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} fit, {} (objective {:e}, {} iterations, {} evaluations)",
            self.method, self.status, self.objective, self.iterations, self.evaluations
        )?;
        write!(f, "{}", tabled::Table::new(self.rows()))
    }
}
