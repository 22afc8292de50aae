//! A working session: the current model, its experiments and the fits made so far.
//!
//! The session is an explicit owner passed to whatever drives the fitting; nothing
//! in the library reaches into it implicitly.

use log::{info, warn};
use peroxide::fuga::ODEIntegrator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::experiment::error::ExperimentError;
use crate::experiment::experiment::{Experiment, ObservationMap};
use crate::experiment::observation::Observation;
use crate::experiment::store::{ExperimentId, ExperimentStore};
use crate::model::error::DefinitionError;
use crate::model::model::Model;
use crate::optim::error::SolverError;
use crate::optim::initials::InitialGuess;
use crate::optim::observer::CallbackObserver;
use crate::optim::optimizers::optimizer::Optimizer;
use crate::optim::problem::Problem;
use crate::optim::runner::solve;
use crate::optim::solution::Solution;
use crate::simulation::setup::SimulationSetup;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No model has been defined")]
    NoModel,
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Experiment(#[from] ExperimentError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Experiment {id} no longer matches the model: {source}")]
    StaleExperiment {
        id: ExperimentId,
        source: ExperimentError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub name: String,
    model: Option<Model>,
    experiments: ExperimentStore,
    solutions: Vec<Solution>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Compiles `text` and makes it the session's model.
    ///
    /// On success the experiment store is cleared, since its experiments were built
    /// against the previous species. On failure the session is left untouched.
    pub fn import_definition(&mut self, text: &str) -> Result<&Model, SessionError> {
        let model = Model::from_definition(text)?;

        if !self.experiments.is_empty() {
            warn!(
                "Replacing the model discards {} experiments",
                self.experiments.len()
            );
        }
        self.experiments.clear();

        Ok(self.model.insert(model))
    }

    pub fn experiments(&self) -> &ExperimentStore {
        &self.experiments
    }

    pub fn experiments_mut(&mut self) -> &mut ExperimentStore {
        &mut self.experiments
    }

    /// Builds an experiment against the current model and stores it
    pub fn add_experiment<S, I>(&mut self, observations: I) -> Result<ExperimentId, SessionError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Observation)>,
    {
        let model = self.model.as_ref().ok_or(SessionError::NoModel)?;
        let experiment = Experiment::new(model, observations)?;
        Ok(self.experiments.add(experiment))
    }

    pub fn remove_experiment(&mut self, id: ExperimentId) -> Result<Experiment, SessionError> {
        Ok(self.experiments.remove(id)?)
    }

    /// Snapshot of the current model and experiments as a fitting problem
    pub fn problem<S: ODEIntegrator + Copy>(
        &self,
        solver: S,
        setup: SimulationSetup,
    ) -> Result<Problem<S>, SessionError> {
        let model = self.model.as_ref().ok_or(SessionError::NoModel)?;
        Ok(Problem::new(model, self.experiments.experiments(), solver, setup)?)
    }

    /// Runs a fit in the calling thread and records its solution
    pub fn fit<S: ODEIntegrator + Copy>(
        &mut self,
        solver: S,
        setup: SimulationSetup,
        optimizer: &dyn Optimizer<S>,
        guess: &InitialGuess,
        observer: Option<CallbackObserver>,
    ) -> Result<&Solution, SessionError> {
        let problem = self.problem(solver, setup)?;
        let solution = solve(&problem, optimizer, guess, observer)?;
        Ok(self.record_solution(solution))
    }

    /// Appends a solution obtained elsewhere, e.g. from a background fit
    pub fn record_solution(&mut self, solution: Solution) -> &Solution {
        self.solutions.push(solution);
        &self.solutions[self.solutions.len() - 1]
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn latest_solution(&self) -> Option<&Solution> {
        self.solutions.last()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            name: self.name.clone(),
            definition: self.model.as_ref().map(|m| m.definition().to_vec()),
            next_experiment_id: self.experiments.next_id(),
            experiments: self
                .experiments
                .iter()
                .map(|(id, experiment)| ExperimentRecord {
                    id: *id,
                    observations: experiment.observations().clone(),
                })
                .collect(),
            solutions: self.solutions.clone(),
        }
    }

    /// Rebuilds a session, re-parsing the definition and re-validating every experiment
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let model = snapshot
            .definition
            .as_deref()
            .map(|lines| Model::from_lines(lines))
            .transpose()?;

        let mut experiments = ExperimentStore::new();
        if !snapshot.experiments.is_empty() {
            let model = model.as_ref().ok_or(SessionError::NoModel)?;
            for record in snapshot.experiments {
                let experiment = Experiment::new(model, record.observations).map_err(|source| {
                    SessionError::StaleExperiment {
                        id: record.id,
                        source,
                    }
                })?;
                experiments.insert(record.id, experiment);
            }
        }
        experiments.set_next_id(snapshot.next_experiment_id);

        info!(
            "Restored session '{}' with {} experiments and {} solutions",
            snapshot.name,
            experiments.len(),
            snapshot.solutions.len()
        );

        Ok(Self {
            name: snapshot.name,
            model,
            experiments,
            solutions: snapshot.solutions,
        })
    }
}

/// One stored experiment, as its species to observation mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: ExperimentId,
    pub observations: ObservationMap,
}

/// Serializable state of a [`Session`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub name: String,
    pub definition: Option<Vec<String>>,
    pub next_experiment_id: ExperimentId,
    pub experiments: Vec<ExperimentRecord>,
    pub solutions: Vec<Solution>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::observation::TimeSeries;
    use peroxide::fuga::RK4;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        let mut session = Session::new("test");
        session.import_definition("A <-> B").unwrap();
        session
            .add_experiment([
                ("A", Observation::initial(1.0)),
                (
                    "B",
                    Observation::TimeSeries(
                        TimeSeries::new(vec![0.0, 1.0], vec![0.0, 0.4], None).unwrap(),
                    ),
                ),
            ])
            .unwrap();
        session
    }

    #[test]
    fn test_failed_import_keeps_state() {
        let mut session = session();
        assert!(session.import_definition("A + B").is_err());
        assert_eq!(session.experiments().len(), 1);
        assert_eq!(session.model().unwrap().species(), &["A", "B"]);
    }

    #[test]
    fn test_successful_import_clears_experiments() {
        let mut session = session();
        session.import_definition("A <-> C").unwrap();
        assert!(session.experiments().is_empty());
        assert_eq!(session.experiments().next_id(), ExperimentId(2));
    }

    #[test]
    fn test_experiment_without_model() {
        let mut session = Session::new("empty");
        assert!(matches!(
            session.add_experiment([("A", Observation::initial(1.0))]),
            Err(SessionError::NoModel)
        ));
    }

    #[test]
    fn test_fit_appends_solution() {
        let mut session = session();
        let optimizer = crate::optim::optimizers::simplex::NelderMeadBuilder::default()
            .max_iters(20)
            .build();
        session
            .fit(
                RK4,
                SimulationSetup::default(),
                &optimizer,
                &InitialGuess::Ones,
                None,
            )
            .unwrap();
        session
            .fit(
                RK4,
                SimulationSetup::default(),
                &optimizer,
                &InitialGuess::Values(vec![2.0, 2.0]),
                None,
            )
            .unwrap();

        assert_eq!(session.solutions().len(), 2);
        assert_eq!(session.solutions()[0].initial_guess, vec![1.0, 1.0]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = session();
        session.remove_experiment(ExperimentId(1)).unwrap();
        session
            .add_experiment([("A", Observation::initial(2.0)), ("B", Observation::initial(0.0))])
            .unwrap();

        let restored = Session::from_snapshot(session.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), session.snapshot());
        assert_eq!(restored.experiments().ids(), vec![ExperimentId(2)]);
        assert_eq!(restored.experiments().next_id(), ExperimentId(3));
    }

    #[test]
    fn test_stale_experiment_is_rejected() {
        let mut snapshot = session().snapshot();
        snapshot.definition = Some(vec!["A <-> C".to_string()]);
        assert!(matches!(
            Session::from_snapshot(snapshot),
            Err(SessionError::StaleExperiment { .. })
        ));
    }
}
