//! The least-squares fitting problem
//!
//! A [`Problem`] owns a snapshot of the model and of every experiment to fit against.
//! Its objective, for a parameter vector `k`, is
//!
//! 1. reflect negative entries of `k` to their absolute value
//! 2. simulate every experiment from its starting concentrations over its time points,
//!    with `t = 0` prepended when absent
//! 3. add the squared deviation between simulated and observed concentration for every
//!    time-series point
//! 4. add the squared deviation between simulated and observed rate for every rate
//!    measurement
//!
//! Evaluation does not mutate the problem, so one problem can be shared between
//! threads.

use log::{debug, warn};
use peroxide::fuga::ODEIntegrator;

use crate::experiment::experiment::Experiment;
use crate::experiment::observation::Observation;
use crate::experiment::store::ExperimentStore;
use crate::model::model::Model;
use crate::simulation::result::SimulationResult;
use crate::simulation::runner::simulate;
use crate::simulation::setup::SimulationSetup;

use super::error::SolverError;
use super::optimizers::utils::reflect;

#[derive(Debug, Clone)]
pub struct Problem<S: ODEIntegrator + Copy> {
    model: Model,
    experiments: Vec<Experiment>,
    simulation_times: Vec<Vec<f64>>,
    setup: SimulationSetup,
    solver: S,
}

impl<S: ODEIntegrator + Copy> Problem<S> {
    /// Creates a fitting problem.
    ///
    /// # Arguments
    /// * `model` - The compiled model
    /// * `experiments` - Experiments built against `model`
    /// * `solver` - Integrator used for every simulation
    /// * `setup` - Integration settings
    pub fn new<'e, I>(
        model: &Model,
        experiments: I,
        solver: S,
        setup: SimulationSetup,
    ) -> Result<Self, SolverError>
    where
        I: IntoIterator<Item = &'e Experiment>,
    {
        let experiments: Vec<Experiment> = experiments.into_iter().cloned().collect();

        if experiments.is_empty() {
            return Err(SolverError::NoExperiments);
        }

        if let Some(experiment) = experiments.iter().find(|e| e.species() != model.species()) {
            return Err(SolverError::IncompatibleExperiment {
                expected: model.species().to_vec(),
                found: experiment.species().to_vec(),
            });
        }

        if !experiments.iter().any(Experiment::has_kinetic_data) {
            warn!("No experiment carries time series or rate data, the objective is constant");
        }

        let simulation_times = experiments.iter().map(Experiment::simulation_times).collect();

        Ok(Self {
            model: model.clone(),
            experiments,
            simulation_times,
            setup,
            solver,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    pub fn setup(&self) -> &SimulationSetup {
        &self.setup
    }

    pub fn solver(&self) -> S {
        self.solver
    }

    pub fn n_parameters(&self) -> usize {
        self.model.n_parameters()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.model.parameter_names()
    }

    /// Evaluates the objective.
    ///
    /// Negative entries of `params` are replaced by their absolute value in place,
    /// and the objective is computed at the reflected point.
    pub fn evaluate(&self, params: &mut [f64]) -> Result<f64, SolverError> {
        self.check_parameter_count(params.len())?;
        reflect(params);

        let mut total = 0.0;
        for (experiment, times) in self.experiments.iter().zip(&self.simulation_times) {
            let result = simulate(
                &self.model,
                experiment.starting_concentrations(),
                times,
                params,
                &self.setup,
                self.solver,
            )?;
            total += self.squared_deviation(experiment, &result)?;
        }

        debug!("Objective {:e} at {:?}", total, params);
        Ok(total)
    }

    /// Evaluates the objective without touching `params`
    pub fn objective(&self, params: &[f64]) -> Result<f64, SolverError> {
        let mut params = params.to_vec();
        self.evaluate(&mut params)
    }

    /// Simulates every experiment at its own time points with `params`
    pub fn simulate_experiments(
        &self,
        params: &[f64],
    ) -> Result<Vec<SimulationResult>, SolverError> {
        self.check_parameter_count(params.len())?;
        let mut params = params.to_vec();
        reflect(&mut params);

        self.experiments
            .iter()
            .zip(&self.simulation_times)
            .map(|(experiment, times)| {
                simulate(
                    &self.model,
                    experiment.starting_concentrations(),
                    times,
                    &params,
                    &self.setup,
                    self.solver,
                )
                .map_err(SolverError::from)
            })
            .collect()
    }

    fn check_parameter_count(&self, found: usize) -> Result<(), SolverError> {
        let expected = self.n_parameters();
        if found != expected {
            return Err(SolverError::ParameterCountMismatch { expected, found });
        }
        Ok(())
    }

    fn squared_deviation(
        &self,
        experiment: &Experiment,
        result: &SimulationResult,
    ) -> Result<f64, SolverError> {
        let tolerance = self.setup.time_tolerance;
        let index_of = |time: f64| {
            result
                .time_index(time, tolerance)
                .ok_or(SolverError::MissingTimePoint(time))
        };

        let mut sum = 0.0;
        for (column, _, observation) in experiment.iter() {
            match observation {
                Observation::TimeSeries(series) => {
                    for (&time, &observed) in series.times.iter().zip(&series.concentrations) {
                        let simulated = result.concentrations[index_of(time)?][column];
                        sum += (simulated - observed).powi(2);
                    }
                }
                Observation::Rate(rate) => {
                    let simulated = result.rates[index_of(rate.time)?][column];
                    sum += (simulated - rate.rate).powi(2);
                }
                Observation::InitialConcentration { .. } | Observation::RawSeries(_) => {}
            }
        }

        Ok(sum)
    }
}

/// Builder for [`Problem`]
pub struct ProblemBuilder<'a, S: ODEIntegrator + Copy> {
    model: &'a Model,
    store: &'a ExperimentStore,
    solver: S,
    setup: SimulationSetup,
}

impl<'a, S: ODEIntegrator + Copy> ProblemBuilder<'a, S> {
    /// Creates a new ProblemBuilder with default settings
    ///
    /// # Arguments
    /// * `model` - The compiled model
    /// * `store` - The experiments to fit against
    /// * `solver` - Integrator used for every simulation
    ///
    /// # Returns
    /// A new ProblemBuilder using [`SimulationSetup::default`]
    pub fn new(model: &'a Model, store: &'a ExperimentStore, solver: S) -> Self {
        Self {
            model,
            store,
            solver,
            setup: SimulationSetup::default(),
        }
    }

    /// Sets the largest internal integration step
    pub fn dt(mut self, dt: f64) -> Self {
        self.setup.dt = dt;
        self
    }

    /// Sets the tolerance for matching observed and simulated times
    pub fn time_tolerance(mut self, tolerance: f64) -> Self {
        self.setup.time_tolerance = tolerance;
        self
    }

    /// Replaces the whole simulation setup
    pub fn setup(mut self, setup: SimulationSetup) -> Self {
        self.setup = setup;
        self
    }

    pub fn build(self) -> Result<Problem<S>, SolverError> {
        Problem::new(self.model, self.store.experiments(), self.solver, self.setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::observation::{RateMeasurement, TimeSeries};
    use approx::assert_relative_eq;
    use peroxide::fuga::RK4;

    fn problem_with_rate() -> Problem<RK4> {
        let model = Model::from_definition("A <-> B").unwrap();
        let experiment = Experiment::new(
            &model,
            [
                ("A", Observation::initial(1.0)),
                (
                    "B",
                    Observation::Rate(RateMeasurement::new(0.0, 0.0, 0.0).unwrap()),
                ),
            ],
        )
        .unwrap();

        Problem::new(&model, [&experiment], RK4, SimulationSetup::default()).unwrap()
    }

    #[test]
    fn test_reflection_mutates_in_place() {
        let problem = problem_with_rate();
        let mut params = [-2.0, 0.5];
        let reflected = problem.evaluate(&mut params).unwrap();

        assert_eq!(params, [2.0, 0.5]);
        assert_relative_eq!(reflected, problem.objective(&[2.0, 0.5]).unwrap());
    }

    #[test]
    fn test_rate_is_compared_at_policy_time() {
        let problem = problem_with_rate();
        // kf = kr: B rate at t=1 is exp(-2)
        let objective = problem.objective(&[1.0, 1.0]).unwrap();
        assert_relative_eq!(objective, (-2.0f64).exp().powi(2), epsilon = 1e-8);
    }

    #[test]
    fn test_time_series_deviation() {
        let model = Model::from_definition("A <-> B").unwrap();
        let experiment = Experiment::new(
            &model,
            [
                ("A", Observation::initial(1.0)),
                (
                    "B",
                    Observation::TimeSeries(
                        TimeSeries::new(vec![1.0], vec![1.0], Some(0.0)).unwrap(),
                    ),
                ),
            ],
        )
        .unwrap();
        let problem =
            Problem::new(&model, [&experiment], RK4, SimulationSetup::default()).unwrap();

        // kr = 0: B(1) = 1 - exp(-1)
        let objective = problem.objective(&[1.0, 0.0]).unwrap();
        assert_relative_eq!(objective, (-1.0f64).exp().powi(2), epsilon = 1e-8);
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let problem = problem_with_rate();
        assert!(matches!(
            problem.objective(&[1.0]),
            Err(SolverError::ParameterCountMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_no_experiments() {
        let model = Model::from_definition("A <-> B").unwrap();
        let store = ExperimentStore::new();
        assert!(matches!(
            ProblemBuilder::new(&model, &store, RK4).build(),
            Err(SolverError::NoExperiments)
        ));
    }

    #[test]
    fn test_incompatible_experiment() {
        let old = Model::from_definition("A <-> B").unwrap();
        let new = Model::from_definition("A <-> C").unwrap();
        let experiment = Experiment::new(
            &old,
            [("A", Observation::initial(1.0)), ("B", Observation::initial(0.0))],
        )
        .unwrap();

        assert!(matches!(
            Problem::new(&new, [&experiment], RK4, SimulationSetup::default()),
            Err(SolverError::IncompatibleExperiment { .. })
        ));
    }
}
