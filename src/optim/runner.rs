//! Entry points for running fits: in the calling thread, on a background worker,
//! or as several randomly seeded starts in parallel.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, info, warn};
use peroxide::fuga::ODEIntegrator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::error::SolverError;
use super::initials::{random_guess, InitialGuess};
use super::observer::CallbackObserver;
use super::optimizers::optimizer::Optimizer;
use super::problem::Problem;
use super::solution::Solution;

/// Runs one fit in the calling thread
///
/// # Arguments
/// * `problem` - The fitting problem
/// * `optimizer` - The minimizer, e.g. from [`Method::optimizer`](super::optimizers::optimizer::Method::optimizer)
/// * `guess` - How to choose the starting point
/// * `observer` - Optional progress callback
pub fn solve<S: ODEIntegrator + Copy>(
    problem: &Problem<S>,
    optimizer: &dyn Optimizer<S>,
    guess: &InitialGuess,
    observer: Option<CallbackObserver>,
) -> Result<Solution, SolverError> {
    let initial_guess = guess.resolve(problem.n_parameters())?;
    debug!("Initial guess {:?}", initial_guess);
    optimizer.optimize(problem, &initial_guess, observer)
}

/// Handle to a fit running on a worker thread
pub struct SolveHandle {
    receiver: Receiver<Result<Solution, SolverError>>,
    worker: Option<JoinHandle<()>>,
}

impl SolveHandle {
    /// Whether the worker has stopped
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Takes the result if the fit has completed, without blocking
    pub fn try_result(&mut self) -> Option<Result<Solution, SolverError>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(SolverError::WorkerDisconnected))
            }
        }
    }

    /// Blocks until the fit completes
    pub fn wait(mut self) -> Result<Solution, SolverError> {
        let result = self
            .receiver
            .recv()
            .unwrap_or(Err(SolverError::WorkerDisconnected));
        self.join();
        result
    }

    /// Blocks for at most `timeout`; returns `None` when the fit is still running.
    ///
    /// The worker keeps running after a timeout, so the handle can be waited on again.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<Solution, SolverError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.join();
                Some(Err(SolverError::WorkerDisconnected))
            }
        }
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Solver worker panicked");
            }
        }
    }
}

/// Runs one fit on a background thread.
///
/// The problem is moved to the worker, so the caller's model and experiments can
/// be edited while the fit is in flight without affecting it.
pub fn spawn_solve<S>(
    problem: Problem<S>,
    optimizer: Box<dyn Optimizer<S> + Send>,
    guess: InitialGuess,
    observer: Option<CallbackObserver>,
) -> SolveHandle
where
    S: ODEIntegrator + Copy + Send + 'static,
{
    let (sender, receiver) = channel::bounded(1);

    let worker = thread::spawn(move || {
        let result = solve(&problem, optimizer.as_ref(), &guess, observer);
        // The receiver may have been dropped by a caller that lost interest
        let _ = sender.send(result);
    });

    SolveHandle {
        receiver,
        worker: Some(worker),
    }
}

/// Runs `starts` fits from random starting points in parallel.
///
/// Starting points are drawn from one generator seeded with `seed`, so a seeded
/// call is reproducible. Failed starts are logged and skipped; the error of the
/// first start is returned only if every start fails. Solutions are ordered by
/// ascending objective.
pub fn multi_start<S>(
    problem: &Problem<S>,
    optimizer: &(dyn Optimizer<S> + Sync),
    starts: usize,
    seed: Option<u64>,
) -> Result<Vec<Solution>, SolverError>
where
    S: ODEIntegrator + Copy + Send + Sync,
{
    if starts == 0 {
        return Err(SolverError::InvalidOptions(
            "at least one start is required".into(),
        ));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let guesses: Vec<Vec<f64>> = (0..starts)
        .map(|_| random_guess(problem.n_parameters(), &mut rng))
        .collect();

    info!("Running {} fits in parallel", starts);

    let results: Vec<Result<Solution, SolverError>> = guesses
        .par_iter()
        .map(|guess| optimizer.optimize(problem, guess, None))
        .collect();

    let mut solutions = Vec::with_capacity(starts);
    let mut first_error = None;
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(solution) => solutions.push(solution),
            Err(err) => {
                warn!("Start {} failed: {}", i, err);
                first_error.get_or_insert(err);
            }
        }
    }

    if let (true, Some(err)) = (solutions.is_empty(), first_error) {
        return Err(err);
    }

    solutions.sort_by(|a, b| a.objective.total_cmp(&b.objective));
    Ok(solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::experiment::Experiment;
    use crate::experiment::observation::{Observation, TimeSeries};
    use crate::model::model::Model;
    use crate::optim::optimizers::optimizer::Method;
    use crate::optim::optimizers::simplex::NelderMeadBuilder;
    use crate::simulation::setup::SimulationSetup;
    use peroxide::fuga::RK4;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn decay_problem() -> Problem<RK4> {
        let model = Model::from_definition("A <-> B\n!kr=0").unwrap();
        let times = vec![0.0, 1.0, 2.0, 3.0];
        let values: Vec<f64> = times.iter().map(|t: &f64| (-0.8 * t).exp()).collect();
        let experiment = Experiment::new(
            &model,
            [
                (
                    "A",
                    Observation::TimeSeries(TimeSeries::new(times, values, None).unwrap()),
                ),
                ("B", Observation::initial(0.0)),
            ],
        )
        .unwrap();
        Problem::new(&model, [&experiment], RK4, SimulationSetup::default()).unwrap()
    }

    #[test]
    fn test_solve_with_observer() {
        let problem = decay_problem();
        let seen = Arc::new(AtomicU64::new(0));
        let counter = seen.clone();
        let observer = CallbackObserver::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let optimizer = Method::Simplex.optimizer::<RK4>();
        let solution = solve(
            &problem,
            optimizer.as_ref(),
            &InitialGuess::Ones,
            Some(observer),
        )
        .unwrap();

        assert!((solution.parameters[0] - 0.8).abs() < 1e-3);
        assert!(seen.load(Ordering::Relaxed) > 0);
        assert_eq!(solution.initial_guess, vec![1.0]);
    }

    #[test]
    fn test_spawn_solve() {
        let optimizer = Box::new(NelderMeadBuilder::default().build());
        let mut handle = spawn_solve(decay_problem(), optimizer, InitialGuess::Ones, None);

        let solution = loop {
            if let Some(result) = handle.wait_timeout(Duration::from_millis(50)) {
                break result.unwrap();
            }
        };

        assert!((solution.parameters[0] - 0.8).abs() < 1e-3);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_spawn_solve_reports_errors() {
        let optimizer = Box::new(NelderMeadBuilder::default().build());
        let handle = spawn_solve(
            decay_problem(),
            optimizer,
            InitialGuess::Values(vec![1.0, 2.0]),
            None,
        );

        assert!(matches!(
            handle.wait(),
            Err(SolverError::ParameterCountMismatch { .. })
        ));
    }

    #[test]
    fn test_multi_start_is_sorted() {
        let problem = decay_problem();
        let optimizer = NelderMeadBuilder::default().build();
        let solutions = multi_start(&problem, &optimizer, 4, Some(3)).unwrap();

        assert_eq!(solutions.len(), 4);
        assert!(solutions
            .windows(2)
            .all(|pair| pair[0].objective <= pair[1].objective));
    }

    #[test]
    fn test_multi_start_needs_a_start() {
        let problem = decay_problem();
        let optimizer = NelderMeadBuilder::default().build();
        assert!(matches!(
            multi_start(&problem, &optimizer, 0, None),
            Err(SolverError::InvalidOptions(_))
        ));
    }
}
