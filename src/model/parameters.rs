//! Deterministic enumeration of a model's free parameters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::expression::ParameterId;

use super::reaction::Reaction;

/// The ordered set of free parameters of a model.
///
/// Parameters are collected reaction by reaction, forward expression first, then
/// reverse expression, keeping the first occurrence of each. Re-parsing the same
/// definition therefore always yields the same enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ParameterId>", into = "Vec<ParameterId>")]
pub struct ParameterSet {
    ids: Vec<ParameterId>,
    index: HashMap<ParameterId, usize>,
}

impl ParameterSet {
    pub fn from_reactions(reactions: &[Reaction]) -> Self {
        reactions
            .iter()
            .flat_map(|r| r.parameters())
            .collect::<Vec<_>>()
            .into()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ParameterId] {
        &self.ids
    }

    pub fn index_of(&self, id: &ParameterId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Looks up a parameter by its textual name (`0kf`, `Km`, ...)
    pub fn position(&self, name: &str) -> Option<usize> {
        ParameterId::parse(name).and_then(|id| self.index_of(&id))
    }

    pub fn names(&self) -> Vec<String> {
        self.ids.iter().map(ToString::to_string).collect()
    }
}

impl From<Vec<ParameterId>> for ParameterSet {
    fn from(ids: Vec<ParameterId>) -> Self {
        let mut set = ParameterSet::default();
        for id in ids {
            if !set.index.contains_key(&id) {
                set.index.insert(id.clone(), set.ids.len());
                set.ids.push(id);
            }
        }
        set
    }
}

impl From<ParameterSet> for Vec<ParameterId> {
    fn from(set: ParameterSet) -> Self {
        set.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parser::parse_reactions;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_parameters_per_reaction() {
        let reactions = parse_reactions(&["E + S <-> ES", "ES <-> E + P"]).unwrap();
        let set = ParameterSet::from_reactions(&reactions);

        assert_eq!(set.names(), vec!["0kf", "0kr", "1kf", "1kr"]);
        assert_eq!(set.position("1kf"), Some(2));
        assert_eq!(set.position("2kf"), None);
    }

    #[test]
    fn test_override_reduces_parameter_count() {
        let reactions = parse_reactions(&["A <-> B", "!kf=2*kr"]).unwrap();
        let set = ParameterSet::from_reactions(&reactions);

        assert_eq!(set.len(), 1);
        assert_eq!(set.names(), vec!["0kr"]);
    }

    #[test]
    fn test_shared_named_parameters() {
        let reactions =
            parse_reactions(&["A <-> B", "!kf=Vmax/Km", "B <-> C", "!kf=Vmax;kr=0kr"]).unwrap();
        let set = ParameterSet::from_reactions(&reactions);

        assert_eq!(set.names(), vec!["Vmax", "Km", "0kr"]);
        assert_eq!(set.position("Km"), Some(1));
    }
}
