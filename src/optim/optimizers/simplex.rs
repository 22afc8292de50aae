//! Nelder-Mead simplex minimizer.
//!
//! The search starts from the scipy `fmin` style simplex around the initial guess
//! (see [`initial_simplex`]) and runs argmin's Nelder-Mead until the standard
//! deviation of the vertex costs drops below the tolerance, the iteration limit is
//! reached, or the evaluation budget is spent.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use argmin::core::observers::ObserverMode;
use argmin::core::{Executor, State};
use argmin::solver::neldermead::NelderMead as ArgminNelderMead;
use argmin_observer_slog::SlogLogger;
use log::info;
use ndarray::Array1;
use peroxide::fuga::ODEIntegrator;

use crate::optim::error::SolverError;
use crate::optim::objective::{BestPoint, Objective};
use crate::optim::observer::CallbackObserver;
use crate::optim::problem::Problem;
use crate::optim::solution::Solution;

use super::optimizer::{Method, Optimizer};
use super::utils::{conclude, initial_simplex, solution_status, IterationCounter};

/// Iterations and evaluations allowed per parameter when no explicit limit is set
const DEFAULT_BUDGET_PER_PARAMETER: u64 = 200;

/// Derivative-free simplex search
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    /// Maximum number of iterations, `200 * n` when unset
    pub max_iters: Option<u64>,
    /// Maximum number of objective evaluations, `200 * n` when unset
    pub max_evals: Option<u64>,
    /// Convergence threshold on the standard deviation of the vertex costs
    pub sd_tolerance: f64,
    /// Wall-clock limit
    pub timeout: Option<Duration>,
    /// Streams iterations to the terminal
    pub verbose: bool,
}

impl NelderMead {
    fn limits(&self, n_parameters: usize) -> (u64, u64) {
        let default = DEFAULT_BUDGET_PER_PARAMETER * n_parameters.max(1) as u64;
        (
            self.max_iters.unwrap_or(default),
            self.max_evals.unwrap_or(default),
        )
    }
}

impl<S: ODEIntegrator + Copy> Optimizer<S> for NelderMead {
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

        let (max_iters, max_evals) = self.limits(n);
        info!(
            "Starting simplex fit of {} parameters (max {} iterations, {} evaluations)",
            n, max_iters, max_evals
        );

        let solver = ArgminNelderMead::new(initial_simplex(initial_guess))
            .with_sd_tolerance(self.sd_tolerance)
            .map_err(|e| SolverError::InvalidOptions(e.to_string()))?;

        let evaluations = AtomicU64::new(0);
        let best = BestPoint::default();
        let iterations = Arc::new(AtomicU64::new(0));
        let objective = Objective::new(problem, &evaluations, &best, Some(max_evals));
        let start = Array1::from_vec(initial_guess.to_vec());

        let mut executor = Executor::new(objective, solver)
            .configure(|state| state.param(start).max_iters(max_iters))
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
            Method::Simplex,
            problem.parameter_names(),
            initial_guess,
            &evaluations,
            best,
            &iterations,
        )
    }

    fn method(&self) -> Method {
        Method::Simplex
    }
}

/// Builder for [`NelderMead`]
pub struct NelderMeadBuilder {
    max_iters: Option<u64>,
    max_evals: Option<u64>,
    sd_tolerance: f64,
    timeout: Option<Duration>,
    verbose: bool,
}

impl NelderMeadBuilder {
    /// Sets the maximum number of iterations
    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = Some(max_iters);
        self
    }

    /// Sets the maximum number of objective evaluations
    pub fn max_evals(mut self, max_evals: u64) -> Self {
        self.max_evals = Some(max_evals);
        self
    }

    /// Sets the convergence threshold on the spread of the vertex costs
    pub fn sd_tolerance(mut self, sd_tolerance: f64) -> Self {
        self.sd_tolerance = sd_tolerance;
        self
    }

    /// Stops the search after `timeout` of wall-clock time
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> NelderMead {
        NelderMead {
            max_iters: self.max_iters,
            max_evals: self.max_evals,
            sd_tolerance: self.sd_tolerance,
            timeout: self.timeout,
            verbose: self.verbose,
        }
    }
}

impl Default for NelderMeadBuilder {
    /// Creates a new NelderMeadBuilder with default settings.
    ///
    /// Default values:
    /// - max_iters: 200 per parameter
    /// - max_evals: 200 per parameter
    /// - sd_tolerance: 1e-8
    /// - timeout: none
    /// - verbose: false
    fn default() -> Self {
        Self {
            max_iters: None,
            max_evals: None,
            sd_tolerance: 1e-8,
            timeout: None,
            verbose: false,
        }
    }
}
