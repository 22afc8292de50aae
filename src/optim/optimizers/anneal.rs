//! Simulated annealing minimizer.
//!
//! Candidates are drawn by scaling every coordinate by a random power of ten whose
//! range shrinks with the temperature, so parameters of very different magnitude are
//! explored on a log scale.

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use argmin::core::observers::ObserverMode;
use argmin::core::{Executor, State};
use argmin::solver::simulatedannealing::{SATempFunc, SimulatedAnnealing};
use argmin_observer_slog::SlogLogger;
use log::info;
use ndarray::Array1;
use peroxide::fuga::ODEIntegrator;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::optim::error::SolverError;
use crate::optim::objective::{BestPoint, Objective, Perturbation};
use crate::optim::observer::CallbackObserver;
use crate::optim::problem::Problem;
use crate::optim::solution::Solution;

use super::optimizer::{Method, Optimizer};
use super::utils::{conclude, solution_status, IterationCounter};

const ACCEPTANCE_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Simulated annealing with a Boltzmann cooling schedule
#[derive(Debug, Clone, PartialEq)]
pub struct Annealing {
    pub initial_temperature: f64,
    /// Largest perturbation, in decades, at the initial temperature
    pub step_scale: f64,
    pub max_iters: u64,
    pub max_evals: Option<u64>,
    /// Stop after this many iterations without a new best point
    pub stall_best: u64,
    /// Seed of the move and acceptance generators
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

impl<S: ODEIntegrator + Copy> Optimizer<S> for Annealing {
    fn optimize(
        &self,
        problem: &Problem<S>,
        initial_guess: &[f64],
        observer: Option<CallbackObserver>,
    ) -> Result<Solution, SolverError> {
        let n = problem.n_parameters();
        if initial_guess.len() != n {
            return Err(SolverError::ParameterCountMismatch {
                expected: n,
                found: initial_guess.len(),
            });
        }

        info!(
            "Starting annealing fit of {} parameters (T0 = {}, max {} iterations)",
            n, self.initial_temperature, self.max_iters
        );

        // Moves and acceptance draw from separate streams
        let (rng, acceptance) = match self.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(ACCEPTANCE_STREAM)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };

        let solver = SimulatedAnnealing::new_with_rng(self.initial_temperature, acceptance)
            .map_err(|e| SolverError::InvalidOptions(e.to_string()))?
            .with_temp_func(SATempFunc::Boltzmann)
            .with_stall_best(self.stall_best);

        let evaluations = AtomicU64::new(0);
        let best = BestPoint::default();
        let iterations = Arc::new(AtomicU64::new(0));
        let objective = Objective::new(problem, &evaluations, &best, self.max_evals)
            .with_perturbation(Perturbation {
                rng: Mutex::new(rng),
                scale: self.step_scale,
                initial_temperature: self.initial_temperature,
            });
        let start = Array1::from_vec(initial_guess.to_vec());

        let mut executor = Executor::new(objective, solver)
            .configure(|state| state.param(start).max_iters(self.max_iters))
            .add_observer(IterationCounter(iterations.clone()), ObserverMode::Always);

        if self.verbose {
            executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
        }
        if let Some(observer) = observer {
            executor = executor.add_observer(observer, ObserverMode::Always);
        }
        if let Some(timeout) = self.timeout {
            executor = executor.timeout(timeout);
        }

        let outcome = executor
            .run()
            .map(|res| solution_status(res.state.get_termination_status()));

        conclude(
            outcome,
            Method::Anneal,
            problem.parameter_names(),
            initial_guess,
            &evaluations,
            best,
            &iterations,
        )
    }

    fn method(&self) -> Method {
        Method::Anneal
    }
}

/// Builder for [`Annealing`]
pub struct AnnealingBuilder {
    initial_temperature: f64,
    step_scale: f64,
    max_iters: u64,
    max_evals: Option<u64>,
    stall_best: u64,
    seed: Option<u64>,
    timeout: Option<Duration>,
    verbose: bool,
}

impl AnnealingBuilder {
    pub fn initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    /// Sets the largest perturbation in decades at the initial temperature
    pub fn step_scale(mut self, scale: f64) -> Self {
        self.step_scale = scale;
        self
    }

    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn max_evals(mut self, max_evals: u64) -> Self {
        self.max_evals = Some(max_evals);
        self
    }

    pub fn stall_best(mut self, iterations: u64) -> Self {
        self.stall_best = iterations;
        self
    }

    /// Seeds the run; equal seeds give identical fits
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Annealing {
        Annealing {
            initial_temperature: self.initial_temperature,
            step_scale: self.step_scale,
            max_iters: self.max_iters,
            max_evals: self.max_evals,
            stall_best: self.stall_best,
            seed: self.seed,
            timeout: self.timeout,
            verbose: self.verbose,
        }
    }
}

impl Default for AnnealingBuilder {
    /// Creates a new AnnealingBuilder with default settings.
    ///
    /// Default values:
    /// - initial_temperature: 10.0
    /// - step_scale: 1.0 (up to one decade)
    /// - max_iters: 2000
    /// - max_evals: unlimited
    /// - stall_best: 500
    /// - seed: from entropy
    fn default() -> Self {
        Self {
            initial_temperature: 10.0,
            step_scale: 1.0,
            max_iters: 2000,
            max_evals: None,
            stall_best: 500,
            seed: None,
            timeout: None,
            verbose: false,
        }
    }
}
