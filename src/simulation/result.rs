//! Simulation Result Module
//!
//! [`SimulationResult`] stores the trajectory of a simulation: the requested time
//! points, the species enumeration of the model, and per time point the concentration
//! vector together with the instantaneous rate vector `dy/dt` at that state.

use serde::{Deserialize, Serialize};

use super::error::SimulationError;

/// Concentration and rate trajectories of one simulation.
///
/// # Fields
///
/// * `times` - Time points at which the trajectory was recorded
/// * `species` - Species names in model enumeration order
/// * `concentrations` - One row per time point, one column per species
/// * `rates` - `dy/dt` evaluated at every row of `concentrations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub times: Vec<f64>,
    pub species: Vec<String>,
    pub concentrations: Vec<Vec<f64>>,
    pub rates: Vec<Vec<f64>>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn species_column(&self, species: &str) -> Result<usize, SimulationError> {
        self.species
            .iter()
            .position(|s| s == species)
            .ok_or_else(|| SimulationError::UnknownSpecies(species.to_string()))
    }

    /// Concentration series of a single species
    pub fn concentration_series(&self, species: &str) -> Result<Vec<f64>, SimulationError> {
        let column = self.species_column(species)?;
        Ok(self.concentrations.iter().map(|row| row[column]).collect())
    }

    /// Rate series of a single species
    pub fn rate_series(&self, species: &str) -> Result<Vec<f64>, SimulationError> {
        let column = self.species_column(species)?;
        Ok(self.rates.iter().map(|row| row[column]).collect())
    }

    /// Index of the recorded time point within `tolerance` of `time`
    pub fn time_index(&self, time: f64, tolerance: f64) -> Option<usize> {
        self.times.iter().position(|t| (t - time).abs() <= tolerance)
    }

    /// Concentration vector recorded at `time`
    pub fn concentrations_at(&self, time: f64, tolerance: f64) -> Option<&[f64]> {
        self.time_index(time, tolerance)
            .map(|i| self.concentrations[i].as_slice())
    }

    /// Rate vector recorded at `time`
    pub fn rates_at(&self, time: f64, tolerance: f64) -> Option<&[f64]> {
        self.time_index(time, tolerance).map(|i| self.rates[i].as_slice())
    }

    /// Final concentration vector
    pub fn last(&self) -> Option<&[f64]> {
        self.concentrations.last().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SimulationResult {
        SimulationResult {
            times: vec![0.0, 1.0],
            species: vec!["A".into(), "B".into()],
            concentrations: vec![vec![1.0, 0.0], vec![0.6, 0.4]],
            rates: vec![vec![-1.0, 1.0], vec![-0.2, 0.2]],
        }
    }

    #[test]
    fn test_series() {
        let result = result();
        assert_eq!(result.concentration_series("B").unwrap(), vec![0.0, 0.4]);
        assert_eq!(result.rate_series("A").unwrap(), vec![-1.0, -0.2]);
        assert!(matches!(
            result.rate_series("C"),
            Err(SimulationError::UnknownSpecies(_))
        ));
    }

    #[test]
    fn test_lookup_with_tolerance() {
        let result = result();
        assert_eq!(result.concentrations_at(1.0 + 1e-12, 1e-9), Some(&[0.6, 0.4][..]));
        assert_eq!(result.rates_at(0.5, 1e-9), None);
        assert_eq!(result.last(), Some(&[0.6, 0.4][..]));
    }
}
