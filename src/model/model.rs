//! The compiled reaction model
//!
//! A [`Model`] is built once from definition text and is immutable afterwards.
//! It owns the reactions, the derived species and parameter enumerations, the
//! compiled rate laws and, per species, the list of reactions that produce or
//! consume it. Together these define the autonomous ODE system
//!
//! ```text
//! dy[s]/dt = Σ ±order * v_r(y, k)
//! ```
//!
//! with a negative sign for reactant appearances and a positive sign for product
//! appearances.

use std::collections::HashMap;
use std::fmt::{self, Display};

use log::{debug, info};

use crate::expression::ParameterId;
use crate::simulation::error::SimulationError;

use super::error::DefinitionError;
use super::parameters::ParameterSet;
use super::parser::parse_reactions;
use super::rates::RateLaw;
use super::reaction::Reaction;

/// One term of a species' derivative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub is_reactant: bool,
    pub order: u32,
    pub reaction: usize,
}

impl Contribution {
    fn sign(&self) -> f64 {
        if self.is_reactant {
            -1.0
        } else {
            1.0
        }
    }
}

impl Display for Contribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_reactant { '-' } else { '+' };
        write!(f, "{}{}*v{}", sign, self.order, self.reaction)
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    definition: Vec<String>,
    reactions: Vec<Reaction>,
    species: Vec<String>,
    species_index: HashMap<String, usize>,
    parameters: ParameterSet,
    rate_laws: Vec<RateLaw>,
    contributions: Vec<Vec<Contribution>>,
}

impl Model {
    /// Compiles a newline separated definition.
    ///
    /// # Examples
    ///
    /// ```
    /// use beaker::model::model::Model;
    ///
    /// let model = Model::from_definition("A + B <-> C").unwrap();
    /// assert_eq!(model.species(), &["A", "B", "C"]);
    /// assert_eq!(model.parameter_names(), vec!["0kf", "0kr"]);
    /// ```
    pub fn from_definition(text: &str) -> Result<Self, DefinitionError> {
        let lines: Vec<&str> = text.lines().collect();
        Self::from_lines(&lines)
    }

    /// Compiles a definition given as individual lines
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, DefinitionError> {
        let reactions = parse_reactions(lines)?;

        let mut species: Vec<String> = Vec::new();
        let mut species_index: HashMap<String, usize> = HashMap::new();
        for name in reactions.iter().flat_map(|r| r.species()) {
            if !species_index.contains_key(name) {
                species_index.insert(name.to_string(), species.len());
                species.push(name.to_string());
            }
        }

        let parameters = ParameterSet::from_reactions(&reactions);

        let rate_laws = reactions
            .iter()
            .map(|r| {
                RateLaw::compile(r, &species_index, &parameters)
                    .ok_or(DefinitionError::Compilation { reaction: r.id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut contributions = vec![Vec::new(); species.len()];
        for reaction in &reactions {
            let sides = [(true, &reaction.reactants), (false, &reaction.products)];
            for (is_reactant, terms) in sides {
                for term in terms {
                    contributions[species_index[&term.species]].push(Contribution {
                        is_reactant,
                        order: term.order,
                        reaction: reaction.id,
                    });
                }
            }
        }

        info!(
            "Compiled model with {} reactions, {} species and {} parameters",
            reactions.len(),
            species.len(),
            parameters.len()
        );
        debug!("Species: {:?}", species);
        debug!("Parameters: {:?}", parameters.names());

        Ok(Self {
            definition: lines.iter().map(|l| l.as_ref().to_string()).collect(),
            reactions,
            species,
            species_index,
            parameters,
            rate_laws,
            contributions,
        })
    }

    /// The definition lines the model was compiled from
    pub fn definition(&self) -> &[String] {
        &self.definition
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn species_position(&self, name: &str) -> Option<usize> {
        self.species_index.get(name).copied()
    }

    pub fn has_species(&self, name: &str) -> bool {
        self.species_index.contains_key(name)
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameter_ids(&self) -> &[ParameterId] {
        self.parameters.ids()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.names()
    }

    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn contributions(&self, species: usize) -> &[Contribution] {
        &self.contributions[species]
    }

    /// All-ones parameter vector
    pub fn default_parameters(&self) -> Vec<f64> {
        vec![1.0; self.n_parameters()]
    }

    /// Net rate of reaction `reaction` at state `y`
    pub fn reaction_rate(&self, reaction: usize, y: &[f64], k: &[f64]) -> Result<f64, SimulationError> {
        self.check_lengths(y.len(), k.len())?;
        let law = self
            .rate_laws
            .get(reaction)
            .ok_or(SimulationError::UnknownReaction(reaction))?;
        Ok(law.rate(y, k))
    }

    /// Net rates of all reactions at state `y`
    pub fn reaction_rates(&self, y: &[f64], k: &[f64]) -> Result<Vec<f64>, SimulationError> {
        self.check_lengths(y.len(), k.len())?;
        Ok(self.rate_laws.iter().map(|law| law.rate(y, k)).collect())
    }

    /// Writes `dy/dt` at state `y` into `dy`.
    ///
    /// # Arguments
    ///
    /// * `y` - Species values, in species enumeration order
    /// * `k` - Parameter values, in parameter enumeration order
    /// * `dy` - Output buffer of the same length as `y`
    ///
    /// # Errors
    ///
    /// Fails if any slice length disagrees with the model's dimensions.
    pub fn derivative(&self, y: &[f64], k: &[f64], dy: &mut [f64]) -> Result<(), SimulationError> {
        if dy.len() != self.n_species() {
            return Err(SimulationError::StateMismatch {
                expected: self.n_species(),
                found: dy.len(),
            });
        }
        let rates = self.reaction_rates(y, k)?;

        for (slot, terms) in dy.iter_mut().zip(&self.contributions) {
            *slot = terms
                .iter()
                .map(|c| c.sign() * c.order as f64 * rates[c.reaction])
                .sum();
        }
        Ok(())
    }

    /// Allocating variant of [`Model::derivative`]
    pub fn derivatives(&self, y: &[f64], k: &[f64]) -> Result<Vec<f64>, SimulationError> {
        let mut dy = vec![0.0; self.n_species()];
        self.derivative(y, k, &mut dy)?;
        Ok(dy)
    }

    fn check_lengths(&self, y: usize, k: usize) -> Result<(), SimulationError> {
        if y != self.n_species() {
            return Err(SimulationError::StateMismatch {
                expected: self.n_species(),
                found: y,
            });
        }
        if k != self.n_parameters() {
            return Err(SimulationError::ParameterMismatch {
                expected: self.n_parameters(),
                found: k,
            });
        }
        Ok(())
    }

    /// Per-species listing of derivative terms, e.g. `("ES", "+1*v0 -1*v1")`
    pub fn mapping(&self) -> Vec<(String, String)> {
        self.species
            .iter()
            .zip(&self.contributions)
            .map(|(name, terms)| {
                let rendered = terms
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                (name.clone(), rendered)
            })
            .collect()
    }
}
