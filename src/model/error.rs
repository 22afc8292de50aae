//! Errors raised while compiling a reaction definition
//!
//! Every variant carries the 1-based line number of the offending statement so that
//! interactive callers can point the user at the problem. A failed compilation never
//! replaces a previously compiled model.

use thiserror::Error;

use crate::expression::ExpressionError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Line {line}: reaction '{text}' has no '<->' separator")]
    MissingArrow { line: usize, text: String },
    #[error("Line {line}: reaction '{text}' has more than one '<->' separator")]
    MultipleArrows { line: usize, text: String },
    #[error("Line {line}: reaction '{text}' has no reactants or no products")]
    EmptySide { line: usize, text: String },
    #[error("Line {line}: '{token}' is not a valid stoichiometric coefficient")]
    InvalidCoefficient { line: usize, token: String },
    #[error("Line {line}: '{token}' is not a valid species name")]
    InvalidSpecies { line: usize, token: String },
    #[error("Line {line}: rate override does not follow a reaction")]
    DanglingOverride { line: usize },
    #[error("Line {line}: reaction {reaction} already has a rate override")]
    DuplicateOverride { line: usize, reaction: usize },
    #[error("Line {line}: malformed rate override '{clause}', expected 'kf=<expr>' or 'kr=<expr>'")]
    MalformedOverride { line: usize, clause: String },
    #[error("Line {line}: {source}")]
    Expression {
        line: usize,
        #[source]
        source: ExpressionError,
    },
    #[error("Line {line}: parameter '{parameter}' refers to a reaction that does not exist")]
    UnknownReaction { line: usize, parameter: String },
    #[error("Reaction {reaction} could not be compiled against the species and parameter sets")]
    Compilation { reaction: usize },
    #[error("Definition contains no reactions")]
    EmptyDefinition,
}
