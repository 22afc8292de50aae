//! Compiled per-reaction rate laws
//!
//! A reaction's net rate is
//!
//! ```text
//! v = kf(k) * Π y[r]^order  -  kr(k) * Π y[p]^order
//! ```
//!
//! where `kf`/`kr` are the (possibly overridden) rate-constant expressions and the
//! products run over reactants and products respectively.

use std::collections::HashMap;

use crate::expression::{Expr, ParameterId};

use super::parameters::ParameterSet;
use super::reaction::{Reaction, SpeciesTerm};

/// A species index raised to a stoichiometric order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factor {
    pub species: usize,
    pub order: u32,
}

impl Factor {
    fn evaluate(&self, y: &[f64]) -> f64 {
        y[self.species].powi(self.order as i32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLaw {
    pub forward: Expr<usize>,
    pub reverse: Expr<usize>,
    pub reactant_factors: Vec<Factor>,
    pub product_factors: Vec<Factor>,
}

impl RateLaw {
    /// Compiles a reaction against the model's species and parameter enumerations.
    ///
    /// Returns `None` if the reaction mentions a species or parameter unknown to the
    /// enumerations, which cannot happen when both were derived from the same reactions.
    pub fn compile(
        reaction: &Reaction,
        species_index: &HashMap<String, usize>,
        parameters: &ParameterSet,
    ) -> Option<Self> {
        let factors = |terms: &[SpeciesTerm]| -> Option<Vec<Factor>> {
            terms
                .iter()
                .map(|t| {
                    species_index.get(&t.species).map(|&species| Factor {
                        species,
                        order: t.order,
                    })
                })
                .collect()
        };

        let resolve = |id: &ParameterId| parameters.index_of(id).ok_or(());

        Some(Self {
            forward: reaction.forward_expression().try_map(&resolve).ok()?,
            reverse: reaction.reverse_expression().try_map(&resolve).ok()?,
            reactant_factors: factors(&reaction.reactants)?,
            product_factors: factors(&reaction.products)?,
        })
    }

    /// Net rate of the reaction at state `y` with parameters `k`
    pub fn rate(&self, y: &[f64], k: &[f64]) -> f64 {
        let forward: f64 = self.reactant_factors.iter().map(|f| f.evaluate(y)).product();
        let reverse: f64 = self.product_factors.iter().map(|f| f.evaluate(y)).product();

        self.forward.evaluate(k) * forward - self.reverse.evaluate(k) * reverse
    }
}
