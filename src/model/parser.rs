//! Line-oriented reaction definition parser
//!
//! A definition is a sequence of lines. Blank lines and lines starting with `#`
//! are ignored. Every other line is either a reaction statement such as
//!
//! ```text
//! E + S <-> ES
//! 2*A + B <-> C
//! ```
//!
//! or a rate override starting with `!` that applies to the reaction directly
//! above it (comments in between are allowed):
//!
//! ```text
//! A <-> B
//! !kf=2*kr
//! ```
//!
//! Override clauses are separated by `;`. Each clause is `kf=<expr>` or `kr=<expr>`;
//! an omitted side keeps the default mass-action constant.

use crate::expression::{parse_expression, ParameterId};

use super::error::DefinitionError;
use super::reaction::{RateOverride, Reaction, Side};

const ARROW: &str = "<->";
const FORBIDDEN_SPECIES_CHARS: [char; 4] = ['+', '*', '<', '>'];

/// Parses definition lines into an ordered list of reactions.
///
/// Line numbers in errors are 1-based positions within `lines`.
///
/// # Arguments
///
/// * `lines` - The definition lines, including comments and blanks
///
/// # Returns
///
/// The reactions, indexed from 0 in order of appearance
pub fn parse_reactions<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Reaction>, DefinitionError> {
    let mut reactions: Vec<Reaction> = Vec::new();

    for (index, raw) in lines.iter().enumerate() {
        let line = index + 1;
        let text = raw.as_ref().trim();

        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        if let Some(body) = text.strip_prefix('!') {
            let reaction = reactions
                .last_mut()
                .ok_or(DefinitionError::DanglingOverride { line })?;

            if reaction.rate_override.is_some() {
                return Err(DefinitionError::DuplicateOverride {
                    line,
                    reaction: reaction.id,
                });
            }

            reaction.rate_override = Some(parse_override(body, reaction.id, line)?);
            continue;
        }

        let reaction = parse_reaction(text, reactions.len(), line)?;
        reactions.push(reaction);
    }

    if reactions.is_empty() {
        return Err(DefinitionError::EmptyDefinition);
    }

    validate_references(&reactions)?;

    Ok(reactions)
}

/// Parses a single reaction statement
fn parse_reaction(text: &str, id: usize, line: usize) -> Result<Reaction, DefinitionError> {
    let mut reaction = Reaction::new(id, line);
    let mut side = Side::Reactant;

    for token in text.split_whitespace() {
        match token {
            "+" => continue,
            ARROW => {
                if side == Side::Product {
                    return Err(DefinitionError::MultipleArrows {
                        line,
                        text: text.to_string(),
                    });
                }
                side = Side::Product;
            }
            _ => {
                let (order, species) = parse_term(token, line)?;
                reaction.add_term(side, species, order);
            }
        }
    }

    if side == Side::Reactant {
        return Err(DefinitionError::MissingArrow {
            line,
            text: text.to_string(),
        });
    }

    if reaction.reactants.is_empty() || reaction.products.is_empty() {
        return Err(DefinitionError::EmptySide {
            line,
            text: text.to_string(),
        });
    }

    Ok(reaction)
}

/// Splits `3*A` into `(3, "A")`; a bare species has order 1
fn parse_term(token: &str, line: usize) -> Result<(u32, &str), DefinitionError> {
    let (order, species) = match token.split_once('*') {
        Some((coefficient, species)) => {
            let order = coefficient
                .parse::<u32>()
                .ok()
                .filter(|o| *o > 0)
                .ok_or_else(|| DefinitionError::InvalidCoefficient {
                    line,
                    token: token.to_string(),
                })?;
            (order, species)
        }
        None => (1, token),
    };

    if species.is_empty() || species.contains(FORBIDDEN_SPECIES_CHARS) {
        return Err(DefinitionError::InvalidSpecies {
            line,
            token: token.to_string(),
        });
    }

    Ok((order, species))
}

/// Parses the body of a `!` line (without the leading `!`)
fn parse_override(body: &str, reaction: usize, line: usize) -> Result<RateOverride, DefinitionError> {
    let mut rate_override = RateOverride {
        line,
        ..Default::default()
    };

    for clause in body.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        let malformed = || DefinitionError::MalformedOverride {
            line,
            clause: clause.to_string(),
        };

        let (target, expression) = clause.split_once('=').ok_or_else(malformed)?;
        let expression = parse_expression(expression, reaction)
            .map_err(|source| DefinitionError::Expression { line, source })?;

        let slot = match target.trim() {
            "kf" => &mut rate_override.forward,
            "kr" => &mut rate_override.reverse,
            _ => return Err(malformed()),
        };

        if slot.is_some() {
            return Err(malformed());
        }
        *slot = Some(expression);
    }

    Ok(rate_override)
}

/// Ensures every `<n>kf` / `<n>kr` reference points at an existing reaction
fn validate_references(reactions: &[Reaction]) -> Result<(), DefinitionError> {
    for reaction in reactions {
        let Some(rate_override) = &reaction.rate_override else {
            continue;
        };

        let expressions = rate_override.forward.iter().chain(rate_override.reverse.iter());
        for parameter in expressions.flat_map(|e| e.parameters()) {
            if let ParameterId::Rate { reaction: target, .. } = parameter {
                if *target >= reactions.len() {
                    return Err(DefinitionError::UnknownReaction {
                        line: rate_override.line,
                        parameter: parameter.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
