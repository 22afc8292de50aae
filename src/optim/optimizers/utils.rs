use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use argmin::core::observers::Observe;
use argmin::core::{Error, State, TerminationReason, TerminationStatus, KV};
use log::{info, warn};
use ndarray::Array1;

use crate::optim::error::SolverError;
use crate::optim::objective::BestPoint;
use crate::optim::solution::{Solution, SolutionStatus};

use super::optimizer::Method;

/// Relative offset of each initial simplex vertex from the starting point
const SIMPLEX_NONZERO_DELTA: f64 = 0.05;
/// Offset used for starting coordinates that are exactly zero
const SIMPLEX_ZERO_DELTA: f64 = 0.00025;

/// Replaces negative entries by their absolute value
pub(crate) fn reflect(params: &mut [f64]) {
    for value in params.iter_mut() {
        *value = value.abs();
    }
}

/// Builds the `n + 1` vertices of the initial simplex around `x0`
///
/// Vertex `i + 1` scales coordinate `i` by 5 %, or sets it to 0.00025 when it is zero.
pub(crate) fn initial_simplex(x0: &[f64]) -> Vec<Array1<f64>> {
    let start = Array1::from_vec(x0.to_vec());
    let mut vertices = vec![start.clone()];

    for i in 0..x0.len() {
        let mut vertex = start.clone();
        vertex[i] = if vertex[i] != 0.0 {
            (1.0 + SIMPLEX_NONZERO_DELTA) * vertex[i]
        } else {
            SIMPLEX_ZERO_DELTA
        };
        vertices.push(vertex);
    }

    vertices
}

/// Maps argmin's termination status onto [`SolutionStatus`]
pub(crate) fn solution_status(status: &TerminationStatus) -> SolutionStatus {
    match status {
        TerminationStatus::Terminated(reason) => match reason {
            TerminationReason::SolverConverged => SolutionStatus::Converged,
            TerminationReason::MaxItersReached => SolutionStatus::MaxIterationsReached,
            TerminationReason::TargetCostReached => SolutionStatus::TargetCostReached,
            TerminationReason::Timeout => SolutionStatus::Timeout,
            TerminationReason::SolverExit(reason) => SolutionStatus::Stopped(reason.clone()),
            other => SolutionStatus::Stopped(format!("{:?}", other)),
        },
        TerminationStatus::NotTerminated => SolutionStatus::Stopped("not terminated".into()),
    }
}

/// Observer recording the number of completed iterations
pub(crate) struct IterationCounter(pub Arc<AtomicU64>);

impl<I: State> Observe<I> for IterationCounter {
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        self.0.store(state.get_iter(), Ordering::Relaxed);
        Ok(())
    }
}

/// Turns the outcome of an executor run into a [`Solution`].
///
/// Running out of evaluations still yields a solution built from the best point
/// seen. Any other failure is reported as an error and no solution is produced.
pub(crate) fn conclude(
    outcome: Result<SolutionStatus, Error>,
    method: Method,
    parameter_names: Vec<String>,
    initial_guess: &[f64],
    evaluations: &AtomicU64,
    best: BestPoint,
    iterations: &AtomicU64,
) -> Result<Solution, SolverError> {
    let status = match outcome {
        Ok(status) => status,
        Err(err) => match err.downcast::<SolverError>() {
            Ok(SolverError::EvaluationLimit) => SolutionStatus::MaxEvaluationsReached,
            Ok(other) => {
                warn!("Solver terminated prematurely: {}", other);
                return Err(other);
            }
            Err(err) => {
                warn!("Solver terminated prematurely: {}", err);
                return Err(SolverError::Terminated(err.to_string()));
            }
        },
    };

    let evaluated = evaluations.load(Ordering::Relaxed);
    let (parameters, objective) = match best.into_inner().unwrap_or_else(|e| e.into_inner()) {
        Some(point) => point,
        None if status == SolutionStatus::MaxEvaluationsReached && evaluated == 0 => {
            warn!("Evaluation budget exhausted before the first evaluation");
            return Err(SolverError::EvaluationLimit);
        }
        None => return Err(SolverError::NonFiniteObjective),
    };

    let solution = Solution {
        parameter_names,
        parameters,
        objective,
        iterations: iterations.load(Ordering::Relaxed),
        evaluations: evaluated,
        status,
        method,
        initial_guess: initial_guess.to_vec(),
    };

    info!(
        "{} fit finished ({}), objective {:e}",
        method, solution.status, solution.objective
    );

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initial_simplex() {
        let vertices = initial_simplex(&[2.0, 0.0]);
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].to_vec(), vec![2.0, 0.0]);
        assert_eq!(vertices[1].to_vec(), vec![2.1, 0.0]);
        assert_eq!(vertices[2].to_vec(), vec![2.0, 0.00025]);
    }

    #[test]
    fn test_reflect() {
        let mut params = [-1.0, 2.0, -0.0];
        reflect(&mut params);
        assert_eq!(params, [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_evaluation_limit_still_yields_solution() {
        let best = BestPoint::new(Some((vec![1.0], 0.5)));
        let solution = conclude(
            Err(SolverError::EvaluationLimit.into()),
            Method::Simplex,
            vec!["0kf".into()],
            &[2.0],
            &AtomicU64::new(10),
            best,
            &AtomicU64::new(3),
        )
        .unwrap();

        assert_eq!(solution.status, SolutionStatus::MaxEvaluationsReached);
        assert_eq!(solution.evaluations, 10);
        assert_eq!(solution.iterations, 3);
    }

    #[test]
    fn test_foreign_errors_terminate() {
        let result = conclude(
            Err(Error::msg("boom")),
            Method::Simplex,
            vec![],
            &[],
            &AtomicU64::new(0),
            BestPoint::default(),
            &AtomicU64::new(0),
        );
        assert!(matches!(result, Err(SolverError::Terminated(_))));
    }

    #[test]
    fn test_empty_budget_reports_limit() {
        let result = conclude(
            Err(SolverError::EvaluationLimit.into()),
            Method::Simplex,
            vec!["0kf".into()],
            &[1.0],
            &AtomicU64::new(0),
            BestPoint::default(),
            &AtomicU64::new(0),
        );
        assert!(matches!(result, Err(SolverError::EvaluationLimit)));
    }

    #[test]
    fn test_no_finite_point() {
        let result = conclude(
            Ok(SolutionStatus::Converged),
            Method::Anneal,
            vec![],
            &[],
            &AtomicU64::new(5),
            BestPoint::default(),
            &AtomicU64::new(1),
        );
        assert!(matches!(result, Err(SolverError::NonFiniteObjective)));
    }
}
