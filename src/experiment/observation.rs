//! Per-species observation variants
//!
//! Every species of an experiment carries exactly one [`Observation`]:
//!
//! - [`Observation::InitialConcentration`]: only the starting value is known
//! - [`Observation::TimeSeries`]: concentrations measured at a list of times
//! - [`Observation::Rate`]: a single instantaneous rate measurement
//! - [`Observation::RawSeries`]: per-row rates and/or starting concentrations from a
//!   bulk rate import, still to be expanded into one experiment per row
//!
//! Constructors validate their input. Deserialised observations are re-validated when
//! an [`Experiment`](super::experiment::Experiment) is built from them.

use serde::{Deserialize, Serialize};

use super::error::ExperimentError;

/// Time substituted for rate measurements taken at `t = 0`.
///
/// At `t = 0` no intermediate complex has formed yet, so most networks produce a
/// trivial rate there. Rates recorded "at the start" are compared against the
/// simulated rate after one time unit instead.
pub const INITIAL_RATE_TIME: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Observation {
    InitialConcentration { starting_concentration: f64 },
    TimeSeries(TimeSeries),
    Rate(RateMeasurement),
    RawSeries(RateSeries),
}

impl Observation {
    pub fn initial(starting_concentration: f64) -> Self {
        Observation::InitialConcentration {
            starting_concentration,
        }
    }

    /// Starting concentration, if one is known
    pub fn starting_concentration(&self) -> Option<f64> {
        match self {
            Observation::InitialConcentration {
                starting_concentration,
            } => Some(*starting_concentration),
            Observation::TimeSeries(series) => Some(series.starting_concentration),
            Observation::Rate(rate) => Some(rate.starting_concentration),
            Observation::RawSeries(series) => series.starting_concentration,
        }
    }

    /// Time points this observation contributes to the experiment
    pub fn time_points(&self) -> Vec<f64> {
        match self {
            Observation::TimeSeries(series) => series.times.clone(),
            Observation::Rate(rate) => vec![rate.time],
            _ => Vec::new(),
        }
    }

    /// Whether the observation carries data to fit against
    pub fn is_kinetic(&self) -> bool {
        matches!(self, Observation::TimeSeries(_) | Observation::Rate(_))
    }

    /// Checks that the observation may be used in an experiment
    pub(crate) fn validate(&self, species: &str) -> Result<(), ExperimentError> {
        let check_value = |value: f64| check_value(species, value);

        match self {
            Observation::InitialConcentration {
                starting_concentration,
            } => check_value(*starting_concentration),
            Observation::TimeSeries(series) => {
                TimeSeries::check(&series.times, &series.concentrations)
                    .map_err(|e| e.for_species(species))?;
                check_value(series.starting_concentration)
            }
            Observation::Rate(rate) => {
                check_time(rate.time)?;
                check_value(rate.rate)?;
                check_value(rate.starting_concentration)
            }
            Observation::RawSeries(_) => {
                Err(ExperimentError::UnexpandedSeries(species.to_string()))
            }
        }
    }
}

/// Concentrations of one species measured over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub times: Vec<f64>,
    pub concentrations: Vec<f64>,
    pub starting_concentration: f64,
}

impl TimeSeries {
    /// Creates a time series.
    ///
    /// Without an explicit starting concentration the series must begin at `t = 0`,
    /// and its first value is used as the starting concentration.
    ///
    /// # Arguments
    ///
    /// * `times` - Measurement times
    /// * `concentrations` - Measured concentrations, parallel to `times`
    /// * `starting_concentration` - Known concentration at `t = 0`
    pub fn new(
        times: Vec<f64>,
        concentrations: Vec<f64>,
        starting_concentration: Option<f64>,
    ) -> Result<Self, ExperimentError> {
        Self::check(&times, &concentrations)?;

        let starting_concentration = match starting_concentration {
            Some(value) => value,
            None if times[0] == 0.0 => concentrations[0],
            None => return Err(ExperimentError::MissingStartingConcentration(String::new())),
        };
        check_value("", starting_concentration)?;

        Ok(Self {
            times,
            concentrations,
            starting_concentration,
        })
    }

    fn check(times: &[f64], concentrations: &[f64]) -> Result<(), ExperimentError> {
        if times.len() != concentrations.len() {
            return Err(ExperimentError::LengthMismatch {
                times: times.len(),
                values: concentrations.len(),
            });
        }

        if times.is_empty() {
            return Err(ExperimentError::EmptySeries);
        }

        times.iter().try_for_each(|t| check_time(*t))?;
        concentrations.iter().try_for_each(|c| check_value("", *c))
    }
}

/// A single instantaneous rate measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMeasurement {
    pub rate: f64,
    pub time: f64,
    pub starting_concentration: f64,
}

impl RateMeasurement {
    /// Creates a rate measurement; `time == 0` is replaced by [`INITIAL_RATE_TIME`]
    pub fn new(rate: f64, time: f64, starting_concentration: f64) -> Result<Self, ExperimentError> {
        check_time(time)?;

        Ok(Self {
            rate,
            time: if time == 0.0 { INITIAL_RATE_TIME } else { time },
            starting_concentration,
        })
    }
}

/// Rates and/or starting concentrations of one species across the rows of a rate table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateSeries {
    pub time: f64,
    pub rates: Option<Vec<f64>>,
    pub concentrations: Option<Vec<f64>>,
    pub starting_concentration: Option<f64>,
}

impl RateSeries {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// Number of rows, if any column has been assigned
    pub fn len(&self) -> Option<usize> {
        self.rates
            .as_ref()
            .or(self.concentrations.as_ref())
            .map(Vec::len)
    }

    /// Whether a starting concentration is available for every row
    pub fn has_starting_concentration(&self) -> bool {
        self.concentrations.is_some() || self.starting_concentration.is_some()
    }

    /// The observation for row `index`.
    ///
    /// Rows with a rate become [`Observation::Rate`], all others
    /// [`Observation::InitialConcentration`]. A per-row concentration column takes
    /// precedence over the scalar starting concentration.
    pub fn get(&self, index: usize, species: &str) -> Result<Observation, ExperimentError> {
        let row = |values: &Vec<f64>| {
            values
                .get(index)
                .copied()
                .ok_or(ExperimentError::IndexOutOfRange {
                    index,
                    len: values.len(),
                })
        };

        let start = match &self.concentrations {
            Some(values) => row(values)?,
            None => self.starting_concentration.ok_or_else(|| {
                ExperimentError::MissingStartingConcentration(species.to_string())
            })?,
        };

        match &self.rates {
            Some(rates) => Ok(Observation::Rate(RateMeasurement::new(
                row(rates)?,
                self.time,
                start,
            )?)),
            None => Ok(Observation::initial(start)),
        }
    }
}

fn check_value(species: &str, value: f64) -> Result<(), ExperimentError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ExperimentError::InvalidValue {
            species: species.to_string(),
            value,
        })
    }
}

fn check_time(time: f64) -> Result<(), ExperimentError> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(ExperimentError::InvalidTime(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_time_series_start_from_first_point() {
        let series = TimeSeries::new(vec![0.0, 1.0], vec![2.0, 1.5], None).unwrap();
        assert_eq!(series.starting_concentration, 2.0);
    }

    #[test]
    fn test_time_series_requires_start() {
        let err = TimeSeries::new(vec![1.0, 2.0], vec![2.0, 1.5], None).unwrap_err();
        assert!(matches!(err, ExperimentError::MissingStartingConcentration(_)));

        let series = TimeSeries::new(vec![1.0, 2.0], vec![2.0, 1.5], Some(3.0)).unwrap();
        assert_eq!(series.starting_concentration, 3.0);
    }

    #[test]
    fn test_time_series_length_mismatch() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![2.0], None).unwrap_err();
        assert_eq!(err, ExperimentError::LengthMismatch { times: 2, values: 1 });
    }

    #[test]
    fn test_negative_time_rejected() {
        let err = TimeSeries::new(vec![-1.0, 1.0], vec![2.0, 1.0], Some(2.0)).unwrap_err();
        assert_eq!(err, ExperimentError::InvalidTime(-1.0));
    }

    #[test]
    fn test_non_finite_concentration_rejected() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![1.0, f64::NAN], None).unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidValue { value, .. } if value.is_nan()));

        let err =
            TimeSeries::new(vec![1.0], vec![0.5], Some(f64::INFINITY)).unwrap_err();
        assert!(matches!(err, ExperimentError::InvalidValue { .. }));
    }

    #[test]
    fn test_deserialised_series_is_revalidated() {
        let obs = Observation::TimeSeries(TimeSeries {
            times: vec![0.0, 1.0],
            concentrations: vec![1.0, f64::NAN],
            starting_concentration: 1.0,
        });
        assert!(matches!(
            obs.validate("A"),
            Err(ExperimentError::InvalidValue { species, .. }) if species == "A"
        ));
    }

    #[test]
    fn test_rate_at_zero_uses_policy_time() {
        let rate = RateMeasurement::new(0.3, 0.0, 1.0).unwrap();
        assert_eq!(rate.time, INITIAL_RATE_TIME);

        let rate = RateMeasurement::new(0.3, 5.0, 1.0).unwrap();
        assert_eq!(rate.time, 5.0);
    }

    #[test]
    fn test_rate_series_expansion() {
        let mut series = RateSeries::new(0.0);
        series.rates = Some(vec![0.1, 0.2]);
        series.concentrations = Some(vec![1.0, 2.0]);

        assert_eq!(series.len(), Some(2));
        assert_eq!(
            series.get(1, "S").unwrap(),
            Observation::Rate(RateMeasurement {
                rate: 0.2,
                time: INITIAL_RATE_TIME,
                starting_concentration: 2.0
            })
        );
        assert!(matches!(
            series.get(2, "S"),
            Err(ExperimentError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_rate_series_without_start() {
        let mut series = RateSeries::new(2.0);
        series.rates = Some(vec![0.1]);
        assert_eq!(
            series.get(0, "S").unwrap_err(),
            ExperimentError::MissingStartingConcentration("S".into())
        );

        series.starting_concentration = Some(0.5);
        assert_eq!(
            series.get(0, "S").unwrap().starting_concentration(),
            Some(0.5)
        );
    }

    #[test]
    fn test_raw_series_is_not_valid_input() {
        let obs = Observation::RawSeries(RateSeries::new(0.0));
        assert_eq!(
            obs.validate("A").unwrap_err(),
            ExperimentError::UnexpandedSeries("A".into())
        );
    }

    #[test]
    fn test_serde_tagging() {
        let obs = Observation::initial(1.5);
        let json = serde_json::to_string(&obs).unwrap();
        assert_eq!(json, r#"{"type":"initial_concentration","starting_concentration":1.5}"#);
        assert_eq!(serde_json::from_str::<Observation>(&json).unwrap(), obs);
    }
}
