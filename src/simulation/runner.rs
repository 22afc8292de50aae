//! Simulation Runner Module
//!
//! Integrates a [`Model`] over a list of requested time points. The integrator is any
//! peroxide [`ODEIntegrator`]; it is driven with equally sized sub-steps of at most
//! [`SimulationSetup::dt`] between consecutive time points so that every requested
//! time is hit exactly. After integration the model derivative is evaluated at every
//! recorded state to obtain the parallel rate trajectory.

use log::debug;
use peroxide::fuga::ODEIntegrator;

use crate::model::model::Model;

use super::error::SimulationError;
use super::result::SimulationResult;
use super::setup::SimulationSetup;
use super::system::ODESystem;

/// Simulates `model` from `y0` and records the state at every time in `times`.
///
/// The integration starts at `times[0]` with state `y0`.
///
/// # Arguments
///
/// * `model` - The compiled model
/// * `y0` - Initial values in species enumeration order
/// * `times` - Finite, non-negative, non-decreasing time points
/// * `params` - Parameter values in parameter enumeration order
/// * `setup` - Integration settings
/// * `solver` - Integrator performing the individual steps
///
/// # Returns
///
/// A [`SimulationResult`] with one concentration row and one rate row per time point
///
/// # Examples
///
/// ```
/// use beaker::prelude::*;
/// use peroxide::fuga::RK4;
///
/// let model = Model::from_definition("A <-> B").unwrap();
/// let result = simulate(
///     &model,
///     &[1.0, 0.0],
///     &[0.0, 10.0],
///     &[1.0, 1.0],
///     &SimulationSetup::default(),
///     RK4,
/// )
/// .unwrap();
///
/// assert!((result.concentrations[1][0] - 0.5).abs() < 1e-6);
/// ```
pub fn simulate<S: ODEIntegrator + Copy>(
    model: &Model,
    y0: &[f64],
    times: &[f64],
    params: &[f64],
    setup: &SimulationSetup,
    solver: S,
) -> Result<SimulationResult, SimulationError> {
    validate_inputs(model, y0, times, params)?;
    setup.validate()?;

    let system = ODESystem::new(model, params);

    let mut state = y0.to_vec();
    let mut concentrations = Vec::with_capacity(times.len());
    let mut t = times[0];
    concentrations.push(state.clone());

    for &target in &times[1..] {
        advance(&system, &mut state, t, target, setup.dt, solver)?;
        t = target;
        concentrations.push(state.clone());
    }

    let rates = concentrations
        .iter()
        .map(|y| model.derivatives(y, params))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Simulated {} time points", times.len());

    Ok(SimulationResult {
        times: times.to_vec(),
        species: model.species().to_vec(),
        concentrations,
        rates,
    })
}

/// Integrates `state` from `from` to `to` in equal steps no larger than `max_dt`
fn advance<S: ODEIntegrator + Copy>(
    system: &ODESystem,
    state: &mut [f64],
    from: f64,
    to: f64,
    max_dt: f64,
    solver: S,
) -> Result<(), SimulationError> {
    let span = to - from;
    if span <= 0.0 {
        return Ok(());
    }

    let n_steps = (span / max_dt).ceil().max(1.0) as usize;
    let dt = span / n_steps as f64;

    for step in 0..n_steps {
        let t = from + step as f64 * dt;
        solver.step(system, t, state, dt)?;
    }

    Ok(())
}

fn validate_inputs(
    model: &Model,
    y0: &[f64],
    times: &[f64],
    params: &[f64],
) -> Result<(), SimulationError> {
    if times.is_empty() {
        return Err(SimulationError::EmptyTimes);
    }

    if y0.len() != model.n_species() {
        return Err(SimulationError::InitialValueMismatch {
            expected: model.n_species(),
            found: y0.len(),
        });
    }

    if params.len() != model.n_parameters() {
        return Err(SimulationError::ParameterMismatch {
            expected: model.n_parameters(),
            found: params.len(),
        });
    }

    let mut previous = 0.0;
    for (i, &t) in times.iter().enumerate() {
        if !t.is_finite() || t < previous {
            return Err(SimulationError::InvalidTimes(i));
        }
        previous = t;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use peroxide::fuga::RK4;

    fn reversible() -> Model {
        Model::from_definition("A <-> B").unwrap()
    }

    #[test]
    fn test_lands_on_requested_times() {
        let model = reversible();
        let times = [0.0, 0.013, 0.5, 0.5, 2.0];
        let result = simulate(
            &model,
            &[1.0, 0.0],
            &times,
            &[1.0, 1.0],
            &SimulationSetup::default(),
            RK4,
        )
        .unwrap();

        assert_eq!(result.times, times.to_vec());
        assert_eq!(result.concentrations[2], result.concentrations[3]);

        // A(t) = 0.5 + 0.5 exp(-2t)
        for (t, row) in result.times.iter().zip(&result.concentrations) {
            assert_relative_eq!(row[0], 0.5 + 0.5 * (-2.0 * t).exp(), epsilon = 1e-8);
            assert_relative_eq!(row[0] + row[1], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rates_are_derivatives() {
        let model = reversible();
        let result = simulate(
            &model,
            &[1.0, 0.0],
            &[0.0, 1.0],
            &[2.0, 1.0],
            &SimulationSetup::default(),
            RK4,
        )
        .unwrap();

        assert_relative_eq!(result.rates[0][0], -2.0);
        assert_relative_eq!(result.rates[0][1], 2.0);
    }

    #[test]
    fn test_zero_state_is_stationary() {
        let model = Model::from_definition("E + S <-> ES\nES <-> E + P").unwrap();
        let result = simulate(
            &model,
            &[0.0; 4],
            &[0.0],
            &model.default_parameters(),
            &SimulationSetup::default(),
            RK4,
        )
        .unwrap();

        assert!(result.rates[0].iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_invalid_inputs() {
        let model = reversible();
        let setup = SimulationSetup::default();

        let err = simulate(&model, &[1.0, 0.0], &[], &[1.0, 1.0], &setup, RK4).unwrap_err();
        assert!(matches!(err, SimulationError::EmptyTimes));

        let err =
            simulate(&model, &[1.0, 0.0], &[0.0, 2.0, 1.0], &[1.0, 1.0], &setup, RK4).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidTimes(2)));

        let err = simulate(&model, &[1.0], &[0.0], &[1.0, 1.0], &setup, RK4).unwrap_err();
        assert!(matches!(err, SimulationError::InitialValueMismatch { .. }));

        let err = simulate(&model, &[1.0, 0.0], &[0.0], &[1.0], &setup, RK4).unwrap_err();
        assert!(matches!(err, SimulationError::ParameterMismatch { .. }));
    }
}
