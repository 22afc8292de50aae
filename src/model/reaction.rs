//! Parsed reactions: stoichiometric terms per side and optional rate-constant
//! overrides.

use std::fmt::{self, Display};

use itertools::Itertools;

use crate::expression::{Expr, ParameterId};

/// Side of a reaction a species appears on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reactant,
    Product,
}

/// A species together with its stoichiometric order within one reaction side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesTerm {
    pub species: String,
    pub order: u32,
}

/// Custom replacement for one or both of a reaction's rate constants
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateOverride {
    /// Source line of the `!` statement
    pub line: usize,
    pub forward: Option<Expr<ParameterId>>,
    pub reverse: Option<Expr<ParameterId>>,
}

/// A single reversible reaction.
///
/// Reactant and product terms keep the order in which species first appear in the
/// statement. Repeated mentions of a species on one side add up their orders.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub id: usize,
    /// Source line of the reaction statement
    pub line: usize,
    pub reactants: Vec<SpeciesTerm>,
    pub products: Vec<SpeciesTerm>,
    pub rate_override: Option<RateOverride>,
}

impl Reaction {
    pub fn new(id: usize, line: usize) -> Self {
        Self {
            id,
            line,
            reactants: Vec::new(),
            products: Vec::new(),
            rate_override: None,
        }
    }

    /// Adds `order` of `species` to one side, merging with an existing term
    pub fn add_term(&mut self, side: Side, species: &str, order: u32) {
        let terms = match side {
            Side::Reactant => &mut self.reactants,
            Side::Product => &mut self.products,
        };

        match terms.iter_mut().find(|t| t.species == species) {
            Some(term) => term.order += order,
            None => terms.push(SpeciesTerm {
                species: species.to_string(),
                order,
            }),
        }
    }

    pub fn reactant_order(&self, species: &str) -> Option<u32> {
        find_order(&self.reactants, species)
    }

    pub fn product_order(&self, species: &str) -> Option<u32> {
        find_order(&self.products, species)
    }

    /// All species of the reaction, reactants first, without repetitions
    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|t| t.species.as_str())
            .unique()
    }

    /// Expression for the forward rate constant, either the override or `<id>kf`
    pub fn forward_expression(&self) -> Expr<ParameterId> {
        self.rate_override
            .as_ref()
            .and_then(|o| o.forward.clone())
            .unwrap_or_else(|| Expr::Parameter(ParameterId::forward(self.id)))
    }

    /// Expression for the reverse rate constant, either the override or `<id>kr`
    pub fn reverse_expression(&self) -> Expr<ParameterId> {
        self.rate_override
            .as_ref()
            .and_then(|o| o.reverse.clone())
            .unwrap_or_else(|| Expr::Parameter(ParameterId::reverse(self.id)))
    }

    /// Parameters the reaction's rate law depends on, forward side first
    pub fn parameters(&self) -> Vec<ParameterId> {
        let forward = self.forward_expression();
        let reverse = self.reverse_expression();

        forward
            .parameters()
            .into_iter()
            .chain(reverse.parameters())
            .unique()
            .cloned()
            .collect()
    }
}

fn find_order(terms: &[SpeciesTerm], species: &str) -> Option<u32> {
    terms.iter().find(|t| t.species == species).map(|t| t.order)
}

impl Display for SpeciesTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.order == 1 {
            write!(f, "{}", self.species)
        } else {
            write!(f, "{}*{}", self.order, self.species)
        }
    }
}

impl Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> {}",
            self.reactants.iter().join(" + "),
            self.products.iter().join(" + ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_species_accumulate() {
        let mut reaction = Reaction::new(0, 1);
        reaction.add_term(Side::Reactant, "A", 1);
        reaction.add_term(Side::Reactant, "A", 1);
        reaction.add_term(Side::Product, "B", 1);

        assert_eq!(reaction.reactant_order("A"), Some(2));
        assert_eq!(reaction.to_string(), "2*A <-> B");
    }

    #[test]
    fn test_default_parameters() {
        let reaction = Reaction::new(4, 1);
        assert_eq!(
            reaction.parameters(),
            vec![ParameterId::forward(4), ParameterId::reverse(4)]
        );
    }

    #[test]
    fn test_species_are_unique() {
        let mut reaction = Reaction::new(0, 1);
        reaction.add_term(Side::Reactant, "E", 1);
        reaction.add_term(Side::Reactant, "S", 1);
        reaction.add_term(Side::Product, "E", 1);
        reaction.add_term(Side::Product, "P", 1);

        assert_eq!(reaction.species().collect::<Vec<_>>(), vec!["E", "S", "P"]);
    }
}
