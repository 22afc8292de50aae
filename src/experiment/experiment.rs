use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use ordered_float::OrderedFloat;

use crate::model::model::Model;

use super::error::ExperimentError;
use super::observation::Observation;

/// Mapping from species name to its observation
pub type ObservationMap = BTreeMap<String, Observation>;

/// One self-consistent set of observations under a single set of starting conditions.
///
/// The species of an experiment match the model's species exactly. On construction
/// the starting concentrations are cached in model enumeration order, together with
/// the ascending, deduplicated list of every time point any observation refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    observations: ObservationMap,
    species: Vec<String>,
    starting_concentrations: Vec<f64>,
    times: Vec<f64>,
}

impl Experiment {
    /// Validates observations against `model` and builds the experiment.
    ///
    /// # Arguments
    ///
    /// * `model` - The model the experiment belongs to
    /// * `observations` - One observation per model species
    ///
    /// # Returns
    ///
    /// The experiment, or the first validation failure
    pub fn new<S, I>(model: &Model, observations: I) -> Result<Self, ExperimentError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Observation)>,
    {
        let observations: ObservationMap = observations
            .into_iter()
            .map(|(species, obs)| (species.into(), obs))
            .collect();

        let missing: Vec<String> = model
            .species()
            .iter()
            .filter(|s| !observations.contains_key(*s))
            .cloned()
            .collect();
        let extra: Vec<String> = observations
            .keys()
            .filter(|s| !model.has_species(s))
            .cloned()
            .collect();

        if !missing.is_empty() || !extra.is_empty() {
            return Err(ExperimentError::SpeciesMismatch { missing, extra });
        }

        let mut starting_concentrations = Vec::with_capacity(model.n_species());
        let mut time_points = BTreeSet::new();

        for species in model.species() {
            let obs = &observations[species];
            obs.validate(species)?;

            let start = obs
                .starting_concentration()
                .ok_or_else(|| ExperimentError::MissingStartingConcentration(species.clone()))?;
            starting_concentrations.push(start);

            time_points.extend(obs.time_points().into_iter().map(OrderedFloat));
        }

        let times: Vec<f64> = time_points.into_iter().map(|t| t.0).collect();
        debug!("Experiment time points: {:?}", times);

        Ok(Self {
            observations,
            species: model.species().to_vec(),
            starting_concentrations,
            times,
        })
    }

    pub fn observations(&self) -> &ObservationMap {
        &self.observations
    }

    pub fn observation(&self, species: &str) -> Option<&Observation> {
        self.observations.get(species)
    }

    /// Observations in model species order, paired with the species index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &Observation)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.as_str(), &self.observations[s]))
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Starting concentrations in model species order
    pub fn starting_concentrations(&self) -> &[f64] {
        &self.starting_concentrations
    }

    /// Ascending, deduplicated time points referenced by the observations
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time points to simulate: [`Experiment::times`] with `t = 0` prepended if absent
    pub fn simulation_times(&self) -> Vec<f64> {
        match self.times.first() {
            Some(t) if *t == 0.0 => self.times.clone(),
            _ => std::iter::once(0.0).chain(self.times.iter().copied()).collect(),
        }
    }

    /// Whether any observation carries kinetic data
    pub fn has_kinetic_data(&self) -> bool {
        self.observations.values().any(Observation::is_kinetic)
    }
}
