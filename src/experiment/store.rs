//! Id-keyed collection of accepted experiments

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use log::info;
use serde::{Deserialize, Serialize};

use super::error::ExperimentError;
use super::experiment::Experiment;

/// Identifier of an experiment within a store; the first id handed out is 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(pub u64);

impl Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Experiments keyed by a monotonically increasing id.
///
/// Ids are never reused, not even after removal or [`ExperimentStore::clear`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentStore {
    experiments: BTreeMap<ExperimentId, Experiment>,
    next_id: u64,
}

impl Default for ExperimentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStore {
    pub fn new() -> Self {
        Self {
            experiments: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Adds a validated experiment and returns its new id
    pub fn add(&mut self, experiment: Experiment) -> ExperimentId {
        let id = ExperimentId(self.next_id);
        self.next_id += 1;
        self.experiments.insert(id, experiment);

        info!("Experiment {} added", id);
        id
    }

    /// Adds all experiments, or none of them if any failed to build
    pub fn add_many<I>(&mut self, experiments: I) -> Result<Vec<ExperimentId>, ExperimentError>
    where
        I: IntoIterator<Item = Result<Experiment, ExperimentError>>,
    {
        let experiments = experiments.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(experiments.into_iter().map(|e| self.add(e)).collect())
    }

    /// Re-inserts an experiment under a known id, as done when restoring a session
    pub(crate) fn insert(&mut self, id: ExperimentId, experiment: Experiment) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.experiments.insert(id, experiment);
    }

    pub fn remove(&mut self, id: ExperimentId) -> Result<Experiment, ExperimentError> {
        let experiment = self
            .experiments
            .remove(&id)
            .ok_or(ExperimentError::UnknownExperiment(id))?;

        info!("Experiment {} removed", id);
        Ok(experiment)
    }

    pub fn get(&self, id: ExperimentId) -> Option<&Experiment> {
        self.experiments.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExperimentId, &Experiment)> {
        self.experiments.iter()
    }

    pub fn experiments(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.values()
    }

    pub fn ids(&self) -> Vec<ExperimentId> {
        self.experiments.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// The id the next added experiment will receive
    pub fn next_id(&self) -> ExperimentId {
        ExperimentId(self.next_id)
    }

    pub(crate) fn set_next_id(&mut self, next: ExperimentId) {
        self.next_id = self.next_id.max(next.0);
    }

    pub fn clear(&mut self) {
        self.experiments.clear();
    }
}
