//! Initial guesses for the parameter search.

use std::fmt::{self, Display};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::SolverError;

/// How the starting point of a fit is chosen
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum InitialGuess {
    /// Every parameter starts at 1
    #[default]
    Ones,
    /// Random values spanning several orders of magnitude, optionally seeded
    Random(Option<u64>),
    /// Explicit values in parameter order
    Values(Vec<f64>),
}

impl InitialGuess {
    /// Produces the starting vector for `n` parameters
    pub fn resolve(&self, n: usize) -> Result<Vec<f64>, SolverError> {
        match self {
            InitialGuess::Ones => Ok(vec![1.0; n]),
            InitialGuess::Random(seed) => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                Ok(random_guess(n, &mut rng))
            }
            InitialGuess::Values(values) if values.len() == n => Ok(values.clone()),
            InitialGuess::Values(values) => Err(SolverError::ParameterCountMismatch {
                expected: n,
                found: values.len(),
            }),
        }
    }
}

/// Draws `n` values of the form `(d + u) * 10^e` with digit `d` in `0..=9`,
/// `u` uniform in `[0, 1)` and exponent `e` in `-3..=2`
pub fn random_guess<R: Rng>(n: usize, rng: &mut R) -> Vec<f64> {
    (0..n)
        .map(|_| {
            let digit = rng.gen_range(0..=9) as f64;
            let fraction: f64 = rng.gen();
            let exponent = rng.gen_range(0..=5) - 3;
            (digit + fraction) * 10f64.powi(exponent)
        })
        .collect()
}

impl FromStr for InitialGuess {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "ones" => return Ok(InitialGuess::Ones),
            "random" => return Ok(InitialGuess::Random(None)),
            _ => {}
        }

        if let Some(seed) = s.strip_prefix("random:") {
            return seed
                .parse()
                .map(|seed| InitialGuess::Random(Some(seed)))
                .map_err(|_| SolverError::InvalidGuess(s.to_string()));
        }

        s.split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map(InitialGuess::Values)
            .map_err(|_| SolverError::InvalidGuess(s.to_string()))
    }
}

impl Display for InitialGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialGuess::Ones => write!(f, "ones"),
            InitialGuess::Random(None) => write!(f, "random"),
            InitialGuess::Random(Some(seed)) => write!(f, "random:{}", seed),
            InitialGuess::Values(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", rendered.join(","))
            }
        }
    }
}
