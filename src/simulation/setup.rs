//! Setup module for configuring ODE simulations.
//!
//! [`SimulationSetup`] controls the internal step size of the fixed-step integrator
//! and the tolerance used when matching observed against simulated time points.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::error::SimulationError;

/// Configuration for numerical integration
///
/// # Fields
///
/// * `dt` - Largest internal integration step (default: 0.01)
/// * `time_tolerance` - Absolute tolerance for time point lookups (default: 1e-9)
///
/// # Examples
///
/// ```
/// use beaker::simulation::setup::SimulationSetupBuilder;
///
/// let setup = SimulationSetupBuilder::default()
///     .dt(0.001)
///     .build()
///     .unwrap();
///
/// assert_eq!(setup.dt, 0.001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
pub struct SimulationSetup {
    #[builder(default = "0.01")]
    pub dt: f64,
    #[builder(default = "1e-9")]
    pub time_tolerance: f64,
}

impl Default for SimulationSetup {
    fn default() -> Self {
        Self {
            dt: 0.01,
            time_tolerance: 1e-9,
        }
    }
}

impl SimulationSetup {
    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimulationError::InvalidStepSize(self.dt));
        }
        Ok(())
    }

    /// Whether two time points are considered identical
    pub fn times_match(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.time_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let setup = SimulationSetupBuilder::default().build().unwrap();
        assert_eq!(setup, SimulationSetup::default());
    }

    #[test]
    fn test_invalid_step_size() {
        let setup = SimulationSetupBuilder::default().dt(0.0).build().unwrap();
        assert!(matches!(
            setup.validate(),
            Err(SimulationError::InvalidStepSize(_))
        ));
    }

    #[test]
    fn test_times_match() {
        let setup = SimulationSetup::default();
        assert!(setup.times_match(0.1 + 0.2, 0.3));
        assert!(!setup.times_match(0.3, 0.31));
    }
}
