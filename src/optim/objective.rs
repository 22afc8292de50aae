//! Adapter exposing a [`Problem`] to argmin.
//!
//! Besides forwarding cost evaluations, the adapter counts evaluations against an
//! optional budget, remembers the best finite point seen, and produces the
//! multiplicative perturbations used by simulated annealing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use argmin::core::{CostFunction, Error};
use argmin::solver::simulatedannealing::Anneal;
use log::trace;
use ndarray::Array1;
use peroxide::fuga::ODEIntegrator;
use rand::rngs::StdRng;
use rand::Rng;

use super::error::SolverError;
use super::problem::Problem;

/// Best reflected parameter vector and its objective
pub(crate) type BestPoint = Mutex<Option<(Vec<f64>, f64)>>;

/// Magnitude given to zero-valued parameters before a multiplicative perturbation
const ZERO_SEED: f64 = 1e-3;

/// Settings of the annealing neighbourhood
pub(crate) struct Perturbation {
    pub rng: Mutex<StdRng>,
    /// Largest change in decades at the initial temperature
    pub scale: f64,
    pub initial_temperature: f64,
}

pub(crate) struct Objective<'a, S: ODEIntegrator + Copy> {
    problem: &'a Problem<S>,
    evaluations: &'a AtomicU64,
    best: &'a BestPoint,
    max_evals: Option<u64>,
    perturbation: Option<Perturbation>,
}

impl<'a, S: ODEIntegrator + Copy> Objective<'a, S> {
    pub fn new(
        problem: &'a Problem<S>,
        evaluations: &'a AtomicU64,
        best: &'a BestPoint,
        max_evals: Option<u64>,
    ) -> Self {
        Self {
            problem,
            evaluations,
            best,
            max_evals,
            perturbation: None,
        }
    }

    pub fn with_perturbation(mut self, perturbation: Perturbation) -> Self {
        self.perturbation = Some(perturbation);
        self
    }

    fn record(&self, params: Vec<f64>, value: f64) {
        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        let improved = best.as_ref().map_or(true, |(_, current)| value < *current);
        if improved {
            *best = Some((params, value));
        }
    }
}

impl<S: ODEIntegrator + Copy> CostFunction for Objective<'_, S> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        if let Some(max) = self.max_evals {
            if self.evaluations.load(Ordering::Relaxed) >= max {
                return Err(SolverError::EvaluationLimit.into());
            }
        }
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let mut params = param.to_vec();
        let value = self.problem.evaluate(&mut params)?;

        if !value.is_finite() {
            trace!("Non-finite objective at {:?}", params);
            return Ok(f64::INFINITY);
        }

        self.record(params, value);
        Ok(value)
    }
}

impl<S: ODEIntegrator + Copy> Anneal for Objective<'_, S> {
    type Param = Array1<f64>;
    type Output = Array1<f64>;
    type Float = f64;

    fn anneal(&self, param: &Self::Param, temp: f64) -> Result<Self::Output, Error> {
        let perturbation = self
            .perturbation
            .as_ref()
            .ok_or_else(|| SolverError::InvalidOptions("annealing without perturbation".into()))?;

        let mut rng = perturbation.rng.lock().unwrap_or_else(|e| e.into_inner());
        let reach = perturbation.scale * (temp / perturbation.initial_temperature).max(0.0);

        Ok(param.mapv(|value| {
            let base = if value == 0.0 {
                ZERO_SEED * rng.gen::<f64>()
            } else {
                value.abs()
            };
            base * 10f64.powf(rng.gen_range(-1.0..=1.0) * reach)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::experiment::Experiment;
    use crate::experiment::observation::{Observation, TimeSeries};
    use crate::model::model::Model;
    use crate::simulation::setup::SimulationSetup;
    use peroxide::fuga::RK4;
    use rand::SeedableRng;

    fn problem() -> Problem<RK4> {
        let model = Model::from_definition("A <-> B").unwrap();
        let experiment = Experiment::new(
            &model,
            [
                ("A", Observation::initial(1.0)),
                (
                    "B",
                    Observation::TimeSeries(
                        TimeSeries::new(vec![0.0, 1.0], vec![0.0, 0.4], None).unwrap(),
                    ),
                ),
            ],
        )
        .unwrap();
        Problem::new(&model, [&experiment], RK4, SimulationSetup::default()).unwrap()
    }

    #[test]
    fn test_budget_and_best_point() {
        let problem = problem();
        let evaluations = AtomicU64::new(0);
        let best = BestPoint::default();
        let objective = Objective::new(&problem, &evaluations, &best, Some(2));

        let first = objective.cost(&Array1::from_vec(vec![1.0, 1.0])).unwrap();
        let second = objective.cost(&Array1::from_vec(vec![-0.5, 0.1])).unwrap();
        let err = objective.cost(&Array1::from_vec(vec![1.0, 1.0])).unwrap_err();

        assert_eq!(evaluations.load(Ordering::Relaxed), 2);
        assert!(matches!(
            err.downcast_ref::<SolverError>(),
            Some(SolverError::EvaluationLimit)
        ));

        let (params, value) = best.lock().unwrap().clone().unwrap();
        assert_eq!(value, first.min(second));
        assert!(params.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_anneal_stays_positive() {
        let problem = problem();
        let evaluations = AtomicU64::new(0);
        let best = BestPoint::default();
        let objective = Objective::new(&problem, &evaluations, &best, None).with_perturbation(
            Perturbation {
                rng: Mutex::new(StdRng::seed_from_u64(1)),
                scale: 1.0,
                initial_temperature: 10.0,
            },
        );

        let start = Array1::from_vec(vec![1.0, 0.0]);
        for _ in 0..100 {
            let next = objective.anneal(&start, 10.0).unwrap();
            assert!(next[0] >= 0.1 && next[0] <= 10.0);
            assert!(next[1] >= 0.0 && next[1] <= ZERO_SEED * 10.0);
        }
    }
}
