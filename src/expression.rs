//! Rate-constant expressions
//!
//! Custom rate laws may replace a reaction's forward or reverse rate constant with a
//! small arithmetic expression over parameters, e.g. `kf=2*kr` or `kr=Vmax/Km`.
//! This module parses such strings into an explicit expression tree and evaluates
//! the tree against a parameter vector.
//!
//! # Grammar
//!
//! Expressions consist of identifiers, numeric literals and the binary operators
//! `+ - * /`. There are no parentheses and no operator precedence in the usual sense:
//! the string is split at the *first* occurrence of `+`; if there is none, at the
//! first `-`; then `*`; then `/`. Both halves are parsed recursively. Hence
//! `a-b-c` groups as `a-(b-c)`.
//!
//! Atoms are resolved as follows:
//!
//! - anything starting with a digit or `.` that parses as a float is a literal
//! - `kf` / `kr` refer to the enclosing reaction's own forward / reverse constant
//! - `<n>kf` / `<n>kr` refer to the rate constants of reaction `n`
//! - any other identifier (`[A-Za-z_][A-Za-z0-9_]*`) is a named global parameter
//!
//! Evaluation is plain IEEE arithmetic. Division by zero yields `inf`/`NaN`, which
//! the optimizer sees as a very poor objective rather than an error.

use std::fmt::{self, Display};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref SCOPED_RATE: Regex = Regex::new(r"^(\d+)(kf|kr)$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Operators in the order in which expressions are split.
const SPLIT_ORDER: [BinaryOp; 4] = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div];

/// Direction of a reaction's rate constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RateRole {
    Forward,
    Reverse,
}

impl RateRole {
    /// The suffix used in textual parameter names (`kf` / `kr`)
    pub fn suffix(&self) -> &'static str {
        match self {
            RateRole::Forward => "kf",
            RateRole::Reverse => "kr",
        }
    }
}

/// Identity of a kinetic parameter.
///
/// Default rate constants are scoped to the reaction that owns them and display as
/// `<reaction-index>kf` / `<reaction-index>kr`. Identifiers introduced by custom
/// expressions are global and shared between all reactions that mention them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterId {
    Rate { reaction: usize, role: RateRole },
    Named(String),
}

impl ParameterId {
    pub fn forward(reaction: usize) -> Self {
        ParameterId::Rate {
            reaction,
            role: RateRole::Forward,
        }
    }

    pub fn reverse(reaction: usize) -> Self {
        ParameterId::Rate {
            reaction,
            role: RateRole::Reverse,
        }
    }

    /// Parses a textual parameter name as produced by [`Display`]
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(caps) = SCOPED_RATE.captures(name) {
            let reaction = caps[1].parse().ok()?;
            let role = if &caps[2] == "kf" {
                RateRole::Forward
            } else {
                RateRole::Reverse
            };
            return Some(ParameterId::Rate { reaction, role });
        }

        IDENTIFIER
            .is_match(name)
            .then(|| ParameterId::Named(name.to_string()))
    }
}

impl Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterId::Rate { reaction, role } => write!(f, "{}{}", reaction, role.suffix()),
            ParameterId::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        }
    }
}

/// Expression tree over parameters of type `P`.
///
/// Parsing produces `Expr<ParameterId>`; once the model's parameter enumeration is
/// known the tree is mapped to `Expr<usize>`, whose leaves index directly into the
/// parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr<P = ParameterId> {
    Literal(f64),
    Parameter(P),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr<P>>,
        rhs: Box<Expr<P>>,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Empty operand in expression '{0}'")]
    EmptyOperand(String),
    #[error("'{0}' is neither a number, kf, kr nor a valid parameter name")]
    InvalidIdentifier(String),
}

impl<P> Expr<P> {
    /// Evaluates the tree, resolving parameters through `lookup`
    pub fn evaluate_with<F>(&self, lookup: &F) -> f64
    where
        F: Fn(&P) -> f64,
    {
        match self {
            Expr::Literal(value) => *value,
            Expr::Parameter(p) => lookup(p),
            Expr::Binary { op, lhs, rhs } => {
                op.apply(lhs.evaluate_with(lookup), rhs.evaluate_with(lookup))
            }
        }
    }

    /// Rewrites every parameter leaf with `f`, failing on the first error
    pub fn try_map<Q, E, F>(&self, f: &F) -> Result<Expr<Q>, E>
    where
        F: Fn(&P) -> Result<Q, E>,
    {
        Ok(match self {
            Expr::Literal(value) => Expr::Literal(*value),
            Expr::Parameter(p) => Expr::Parameter(f(p)?),
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.try_map(f)?),
                rhs: Box::new(rhs.try_map(f)?),
            },
        })
    }

    /// Parameters referenced by the tree, left to right, with repetitions
    pub fn parameters(&self) -> Vec<&P> {
        let mut found = Vec::new();
        self.collect_parameters(&mut found);
        found
    }

    fn collect_parameters<'a>(&'a self, found: &mut Vec<&'a P>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Parameter(p) => found.push(p),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_parameters(found);
                rhs.collect_parameters(found);
            }
        }
    }
}

impl Expr<usize> {
    /// Evaluates the tree against a parameter vector
    pub fn evaluate(&self, params: &[f64]) -> f64 {
        self.evaluate_with(&|&i| params[i])
    }
}

impl<P: Display> Display for Expr<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Parameter(p) => write!(f, "{}", p),
            Expr::Binary { op, lhs, rhs } => {
                write_operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs)
            }
        }
    }
}

fn write_operand<P: Display>(f: &mut fmt::Formatter<'_>, expr: &Expr<P>) -> fmt::Result {
    match expr {
        Expr::Binary { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

/// Parses an override expression belonging to reaction `reaction`.
///
/// `kf` and `kr` inside the expression are bound to that reaction's own constants.
///
/// # Examples
///
/// ```
/// use beaker::expression::{parse_expression, ParameterId};
///
/// let expr = parse_expression("2*kr", 0).unwrap();
/// assert_eq!(expr.parameters(), vec![&ParameterId::reverse(0)]);
/// ```
pub fn parse_expression(text: &str, reaction: usize) -> Result<Expr<ParameterId>, ExpressionError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    parse_node(&compact, reaction)
}

fn parse_node(text: &str, reaction: usize) -> Result<Expr<ParameterId>, ExpressionError> {
    if text.is_empty() {
        return Err(ExpressionError::EmptyOperand(text.to_string()));
    }

    if let Some(value) = parse_literal(text) {
        return Ok(Expr::Literal(value));
    }

    for op in SPLIT_ORDER {
        if let Some(pos) = find_operator(text, op.symbol()) {
            let (lhs, rhs) = (&text[..pos], &text[pos + 1..]);
            if lhs.is_empty() || rhs.is_empty() {
                return Err(ExpressionError::EmptyOperand(text.to_string()));
            }

            return Ok(Expr::Binary {
                op,
                lhs: Box::new(parse_node(lhs, reaction)?),
                rhs: Box::new(parse_node(rhs, reaction)?),
            });
        }
    }

    parse_atom(text, reaction).map(Expr::Parameter)
}

fn parse_literal(text: &str) -> Option<f64> {
    let first = text.chars().next()?;
    if first.is_ascii_digit() || first == '.' {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_atom(token: &str, reaction: usize) -> Result<ParameterId, ExpressionError> {
    match token {
        "kf" => Ok(ParameterId::forward(reaction)),
        "kr" => Ok(ParameterId::reverse(reaction)),
        _ => ParameterId::parse(token)
            .ok_or_else(|| ExpressionError::InvalidIdentifier(token.to_string())),
    }
}

/// Position of the first `op` that is a real operator.
///
/// A sign directly after the exponent marker of a numeric literal (`2.5e-3`)
/// belongs to the literal and is skipped.
fn find_operator(text: &str, op: char) -> Option<usize> {
    text.char_indices()
        .filter(|&(_, c)| c == op)
        .map(|(i, _)| i)
        .find(|&i| !(matches!(op, '+' | '-') && is_exponent_sign(text, i)))
}

fn is_exponent_sign(text: &str, pos: usize) -> bool {
    let head = &text[..pos];
    let Some(mantissa) = head.strip_suffix(['e', 'E']) else {
        return false;
    };

    // The mantissa is whatever follows the last operator before the sign
    let start = mantissa
        .rfind(['+', '-', '*', '/'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let mantissa = &mantissa[start..];

    !mantissa.is_empty()
        && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
        && mantissa.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn index_of(p: &ParameterId) -> Result<usize, ()> {
        match p {
            ParameterId::Rate { role, .. } => Ok(*role as usize),
            ParameterId::Named(_) => Ok(2),
        }
    }

    #[test]
    fn test_literal() {
        let expr = parse_expression("2.5", 0).unwrap();
        assert_eq!(expr, Expr::Literal(2.5));
    }

    #[test]
    fn test_kf_kr_are_reaction_scoped() {
        let expr = parse_expression("kf*kr", 3).unwrap();
        assert_eq!(
            expr.parameters(),
            vec![&ParameterId::forward(3), &ParameterId::reverse(3)]
        );
    }

    #[test]
    fn test_explicit_reaction_reference() {
        let expr = parse_expression("0kf/2", 4).unwrap();
        assert_eq!(expr.parameters(), vec![&ParameterId::forward(0)]);
    }

    #[test]
    fn test_named_parameter() {
        let expr = parse_expression("Vmax / Km", 0).unwrap();
        assert_eq!(
            expr.parameters(),
            vec![
                &ParameterId::Named("Vmax".into()),
                &ParameterId::Named("Km".into())
            ]
        );
    }

    #[test]
    fn test_first_occurrence_grouping() {
        // a-b-c groups as a-(b-c)
        let expr = parse_expression("kf-kr-Km", 0)
            .unwrap()
            .try_map(&index_of)
            .unwrap();
        let value = expr.evaluate(&[10.0, 4.0, 1.0]);
        assert_relative_eq!(value, 10.0 - (4.0 - 1.0));
    }

    #[test]
    fn test_addition_splits_before_multiplication() {
        let expr = parse_expression("2*kf+3", 0)
            .unwrap()
            .try_map(&index_of)
            .unwrap();
        assert_relative_eq!(expr.evaluate(&[5.0, 0.0, 0.0]), 13.0);
    }

    #[test]
    fn test_exponent_literal_is_not_split() {
        let expr = parse_expression("2.5e-3*kf", 0)
            .unwrap()
            .try_map(&index_of)
            .unwrap();
        assert_relative_eq!(expr.evaluate(&[2.0, 0.0, 0.0]), 5e-3);
    }

    #[test]
    fn test_division_by_zero_propagates() {
        let expr = parse_expression("kf/kr", 0)
            .unwrap()
            .try_map(&index_of)
            .unwrap();
        assert!(expr.evaluate(&[1.0, 0.0, 0.0]).is_infinite());
        assert!(expr.evaluate(&[0.0, 0.0, 0.0]).is_nan());
    }

    #[test]
    fn test_invalid_identifier() {
        let err = parse_expression("2*k$", 0).unwrap_err();
        assert_eq!(err, ExpressionError::InvalidIdentifier("k$".into()));
    }

    #[test]
    fn test_empty_operand() {
        assert!(matches!(
            parse_expression("kf*", 0),
            Err(ExpressionError::EmptyOperand(_))
        ));
        assert!(matches!(
            parse_expression("", 0),
            Err(ExpressionError::EmptyOperand(_))
        ));
    }

    #[test]
    fn test_parameter_id_display_roundtrip() {
        for id in [
            ParameterId::forward(12),
            ParameterId::reverse(0),
            ParameterId::Named("Km".into()),
        ] {
            assert_eq!(ParameterId::parse(&id.to_string()), Some(id));
        }
    }

    #[test]
    fn test_display() {
        let expr = parse_expression("2*kr+Km", 1).unwrap();
        assert_eq!(expr.to_string(), "(2 * 1kr) + Km");
    }
}
