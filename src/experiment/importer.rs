//! Importers turning column tables into experiments
//!
//! [`ConcentrationImporter`] builds a single experiment from a table holding a time
//! column and one concentration column per measured species.
//!
//! [`RateImporter`] handles tables in which every row is an independent experiment:
//! species columns hold measured rates and/or per-row starting concentrations, and one
//! measurement time applies to the whole table. Each row expands into one experiment.
//!
//! Species without data need a starting concentration, either set explicitly or
//! filled in with zero by `autocomplete`.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::model::model::Model;

use super::error::ExperimentError;
use super::experiment::Experiment;
use super::observation::{Observation, RateSeries, TimeSeries};
use super::table::DataTable;

/// Builds one experiment from time-resolved concentration data.
///
/// # Examples
///
/// ```
/// use beaker::prelude::*;
///
/// let model = Model::from_definition("A <-> B").unwrap();
/// let table = DataTable::from_columns([
///     ("t", vec![0.0, 1.0, 2.0]),
///     ("b", vec![0.0, 0.4, 0.49]),
/// ])
/// .unwrap();
///
/// let mut importer = ConcentrationImporter::new(&model, &table);
/// importer.set_time_column("t").unwrap();
/// importer.assign("B", "b").unwrap();
/// importer.set_starting_concentration("A", 1.0).unwrap();
///
/// let experiment = importer.build(false).unwrap();
/// assert_eq!(experiment.times(), &[0.0, 1.0, 2.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ConcentrationImporter<'a> {
    model: &'a Model,
    table: &'a DataTable,
    time_column: Option<String>,
    series: BTreeMap<String, String>,
    starts: BTreeMap<String, f64>,
}

impl<'a> ConcentrationImporter<'a> {
    pub fn new(model: &'a Model, table: &'a DataTable) -> Self {
        Self {
            model,
            table,
            time_column: None,
            series: BTreeMap::new(),
            starts: BTreeMap::new(),
        }
    }

    pub fn set_time_column(&mut self, column: &str) -> Result<&mut Self, ExperimentError> {
        self.table.column(column)?;
        self.time_column = Some(column.to_string());
        debug!("Using '{}' as the time column", column);
        Ok(self)
    }

    /// Assigns a concentration column to a species
    pub fn assign(&mut self, species: &str, column: &str) -> Result<&mut Self, ExperimentError> {
        check_species(self.model, species)?;
        self.table.column(column)?;

        self.series.insert(species.to_string(), column.to_string());
        debug!("Column '{}' assigned to species '{}'", column, species);
        Ok(self)
    }

    /// Sets a known concentration at `t = 0`
    pub fn set_starting_concentration(
        &mut self,
        species: &str,
        value: f64,
    ) -> Result<&mut Self, ExperimentError> {
        check_species(self.model, species)?;
        self.starts.insert(species.to_string(), value);
        Ok(self)
    }

    /// Species for which no starting concentration can be determined yet
    pub fn unset_species(&self) -> Vec<String> {
        let first_time = self
            .time_column
            .as_deref()
            .and_then(|c| self.table.column(c).ok())
            .and_then(|t| t.first().copied());

        self.model
            .species()
            .iter()
            .filter(|s| !self.starts.contains_key(*s))
            .filter(|s| !(self.series.contains_key(*s) && first_time == Some(0.0)))
            .cloned()
            .collect()
    }

    /// Validates the assignments and builds the experiment
    pub fn build(&self, autocomplete: bool) -> Result<Experiment, ExperimentError> {
        let time_column = self
            .time_column
            .as_deref()
            .ok_or(ExperimentError::MissingTimeColumn)?;
        let times = self.table.column(time_column)?;

        let mut observations = BTreeMap::new();
        for species in self.model.species() {
            let start = self.starts.get(species).copied();

            let observation = match (self.series.get(species), start) {
                (Some(column), start) => {
                    let values = self.table.column(column)?;
                    let series = TimeSeries::new(times.to_vec(), values.to_vec(), start)
                        .map_err(|e| e.for_species(species))?;
                    Observation::TimeSeries(series)
                }
                (None, Some(value)) => Observation::initial(value),
                (None, None) if autocomplete => {
                    warn!("Starting concentration of '{}' set to 0", species);
                    Observation::initial(0.0)
                }
                (None, None) => {
                    return Err(ExperimentError::MissingStartingConcentration(species.clone()))
                }
            };

            observations.insert(species.clone(), observation);
        }

        let experiment = Experiment::new(self.model, observations)?;
        info!("Imported concentration data for {} species", self.series.len());
        Ok(experiment)
    }
}

/// Builds one experiment per table row from rate measurements.
///
/// # Examples
///
/// ```
/// use beaker::prelude::*;
///
/// let model = Model::from_definition("S <-> P").unwrap();
/// let table = DataTable::from_columns([
///     ("s0", vec![1.0, 2.0, 4.0]),
///     ("v", vec![0.1, 0.18, 0.3]),
/// ])
/// .unwrap();
///
/// let mut importer = RateImporter::new(&model, &table, 0.0);
/// importer.assign_concentrations("S", "s0").unwrap();
/// importer.assign_rates("P", "v").unwrap();
/// importer.set_starting_concentration("P", 0.0).unwrap();
///
/// let experiments = importer.build(false).unwrap();
/// assert_eq!(experiments.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RateImporter<'a> {
    model: &'a Model,
    table: &'a DataTable,
    time: f64,
    length: Option<usize>,
    series: BTreeMap<String, RateSeries>,
    starts: BTreeMap<String, f64>,
}

impl<'a> RateImporter<'a> {
    /// Creates an importer whose rates were all measured at `time`
    pub fn new(model: &'a Model, table: &'a DataTable, time: f64) -> Self {
        Self {
            model,
            table,
            time,
            length: None,
            series: BTreeMap::new(),
            starts: BTreeMap::new(),
        }
    }

    /// Assigns a column of measured rates to a species
    pub fn assign_rates(&mut self, species: &str, column: &str) -> Result<&mut Self, ExperimentError> {
        let values = self.checked_column(species, column)?;
        self.series_mut(species).rates = Some(values);
        debug!("Column '{}' assigned to '{}' as rates", column, species);
        Ok(self)
    }

    /// Assigns a column of per-row starting concentrations to a species
    pub fn assign_concentrations(
        &mut self,
        species: &str,
        column: &str,
    ) -> Result<&mut Self, ExperimentError> {
        let values = self.checked_column(species, column)?;
        self.series_mut(species).concentrations = Some(values);
        debug!("Column '{}' assigned to '{}' as starting concentrations", column, species);
        Ok(self)
    }

    /// Sets one starting concentration shared by all rows
    pub fn set_starting_concentration(
        &mut self,
        species: &str,
        value: f64,
    ) -> Result<&mut Self, ExperimentError> {
        check_species(self.model, species)?;
        if let Some(series) = self.series.get_mut(species) {
            series.starting_concentration = Some(value);
        }
        self.starts.insert(species.to_string(), value);
        Ok(self)
    }

    /// Number of rows, once any column has been assigned
    pub fn len(&self) -> Option<usize> {
        self.length
    }

    /// Species for which no starting concentration can be determined yet
    pub fn unset_species(&self) -> Vec<String> {
        self.model
            .species()
            .iter()
            .filter(|s| {
                let series_start = self
                    .series
                    .get(*s)
                    .is_some_and(RateSeries::has_starting_concentration);
                !series_start && !self.starts.contains_key(*s)
            })
            .cloned()
            .collect()
    }

    /// The per-species observations before row expansion
    pub fn raw_observations(&self) -> BTreeMap<String, Observation> {
        self.series
            .iter()
            .map(|(s, series)| (s.clone(), Observation::RawSeries(series.clone())))
            .collect()
    }

    /// Validates the assignments and expands them into one experiment per row.
    ///
    /// Either every row produces a valid experiment or an error is returned.
    pub fn build(&self, autocomplete: bool) -> Result<Vec<Experiment>, ExperimentError> {
        let length = self.length.ok_or(ExperimentError::NoData)?;

        let mut entries: BTreeMap<String, Observation> = BTreeMap::new();
        for species in self.model.species() {
            let start = self.starts.get(species).copied();

            let entry = match (self.series.get(species), start) {
                (Some(series), _) => {
                    let mut series = series.clone();
                    if !series.has_starting_concentration() && autocomplete {
                        warn!("Starting concentration of '{}' set to 0", species);
                        series.starting_concentration = Some(0.0);
                    }
                    Observation::RawSeries(series)
                }
                (None, Some(value)) => Observation::initial(value),
                (None, None) if autocomplete => {
                    warn!("Starting concentration of '{}' set to 0", species);
                    Observation::initial(0.0)
                }
                (None, None) => {
                    return Err(ExperimentError::MissingStartingConcentration(species.clone()))
                }
            };

            entries.insert(species.clone(), entry);
        }

        let experiments = (0..length)
            .map(|row| {
                let observations = entries
                    .iter()
                    .map(|(species, entry)| {
                        let obs = match entry {
                            Observation::RawSeries(series) => series.get(row, species)?,
                            other => other.clone(),
                        };
                        Ok((species.clone(), obs))
                    })
                    .collect::<Result<BTreeMap<_, _>, ExperimentError>>()?;

                Experiment::new(self.model, observations)
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Imported {} rate experiments", experiments.len());
        Ok(experiments)
    }

    fn series_mut(&mut self, species: &str) -> &mut RateSeries {
        let start = self.starts.get(species).copied();
        let time = self.time;

        self.series.entry(species.to_string()).or_insert_with(|| RateSeries {
            starting_concentration: start,
            ..RateSeries::new(time)
        })
    }

    /// Validates species and column and enforces equal column lengths
    fn checked_column(&mut self, species: &str, column: &str) -> Result<Vec<f64>, ExperimentError> {
        check_species(self.model, species)?;
        let values = self.table.column(column)?;

        match self.length {
            Some(expected) if expected != values.len() => {
                return Err(ExperimentError::ColumnLength {
                    column: column.to_string(),
                    expected,
                    found: values.len(),
                })
            }
            Some(_) => {}
            None => self.length = Some(values.len()),
        }

        Ok(values.to_vec())
    }
}

fn check_species(model: &Model, species: &str) -> Result<(), ExperimentError> {
    if model.has_species(species) {
        Ok(())
    } else {
        Err(ExperimentError::UnknownSpecies(species.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::observation::{RateMeasurement, INITIAL_RATE_TIME};
    use pretty_assertions::assert_eq;

    fn model() -> Model {
        Model::from_definition("E + S <-> ES\nES <-> E + P").unwrap()
    }

    #[test]
    fn test_concentration_import() {
        let model = model();
        let table = DataTable::from_columns([
            ("time", vec![0.0, 1.0, 2.0]),
            ("product", vec![0.0, 0.1, 0.15]),
        ])
        .unwrap();

        let mut importer = ConcentrationImporter::new(&model, &table);
        importer.set_time_column("time").unwrap();
        importer.assign("P", "product").unwrap();
        importer.set_starting_concentration("E", 0.1).unwrap();
        importer.set_starting_concentration("S", 1.0).unwrap();

        assert_eq!(importer.unset_species(), vec!["ES"]);
        assert_eq!(
            importer.build(false).unwrap_err(),
            ExperimentError::MissingStartingConcentration("ES".into())
        );

        let experiment = importer.build(true).unwrap();
        assert_eq!(experiment.starting_concentrations(), &[0.1, 1.0, 0.0, 0.0]);
        assert_eq!(experiment.times(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_concentration_import_requires_time_column() {
        let model = model();
        let table = DataTable::from_columns([("p", vec![0.0])]).unwrap();
        let importer = ConcentrationImporter::new(&model, &table);
        assert_eq!(
            importer.build(true).unwrap_err(),
            ExperimentError::MissingTimeColumn
        );
    }

    #[test]
    fn test_series_not_starting_at_zero_needs_start() {
        let model = Model::from_definition("A <-> B").unwrap();
        let table =
            DataTable::from_columns([("t", vec![1.0, 2.0]), ("b", vec![0.3, 0.4])]).unwrap();

        let mut importer = ConcentrationImporter::new(&model, &table);
        importer.set_time_column("t").unwrap();
        importer.assign("B", "b").unwrap();
        importer.set_starting_concentration("A", 1.0).unwrap();

        assert_eq!(importer.unset_species(), vec!["B"]);
        assert_eq!(
            importer.build(true).unwrap_err(),
            ExperimentError::MissingStartingConcentration("B".into())
        );

        importer.set_starting_concentration("B", 0.0).unwrap();
        assert!(importer.build(false).is_ok());
    }

    #[test]
    fn test_blank_cells_are_rejected() {
        let model = Model::from_definition("A <-> B").unwrap();
        let table = DataTable::from_columns([
            ("t", vec![0.0, 1.0, 2.0]),
            ("b", vec![0.0, f64::NAN, 0.4]),
        ])
        .unwrap();

        let mut importer = ConcentrationImporter::new(&model, &table);
        importer.set_time_column("t").unwrap();
        importer.assign("B", "b").unwrap();
        importer.set_starting_concentration("A", 1.0).unwrap();

        assert!(matches!(
            importer.build(false),
            Err(ExperimentError::InvalidValue { species, value }) if species == "B" && value.is_nan()
        ));
    }

    #[test]
    fn test_unknown_species_and_column() {
        let model = model();
        let table = DataTable::from_columns([("t", vec![0.0])]).unwrap();
        let mut importer = ConcentrationImporter::new(&model, &table);

        assert_eq!(
            importer.assign("X", "t").unwrap_err(),
            ExperimentError::UnknownSpecies("X".into())
        );
        assert_eq!(
            importer.assign("P", "missing").unwrap_err(),
            ExperimentError::UnknownColumn("missing".into())
        );
    }

    #[test]
    fn test_rate_import_expands_rows() {
        let model = model();
        let table = DataTable::from_columns([
            ("substrate", vec![0.5, 1.0]),
            ("rate", vec![0.01, 0.02]),
        ])
        .unwrap();

        let mut importer = RateImporter::new(&model, &table, 0.0);
        importer.assign_concentrations("S", "substrate").unwrap();
        importer.assign_rates("P", "rate").unwrap();
        importer.set_starting_concentration("E", 0.1).unwrap();

        assert_eq!(importer.len(), Some(2));
        assert_eq!(importer.unset_species(), vec!["ES", "P"]);
        assert!(matches!(
            importer.raw_observations()["S"],
            Observation::RawSeries(_)
        ));

        let experiments = importer.build(true).unwrap();
        assert_eq!(experiments.len(), 2);
        assert_eq!(experiments[1].starting_concentrations(), &[0.1, 1.0, 0.0, 0.0]);
        assert_eq!(
            experiments[1].observation("P"),
            Some(&Observation::Rate(RateMeasurement {
                rate: 0.02,
                time: INITIAL_RATE_TIME,
                starting_concentration: 0.0,
            }))
        );
        assert_eq!(experiments[0].times(), &[INITIAL_RATE_TIME]);
    }

    #[test]
    fn test_rate_import_length_check() {
        let model = model();
        let table =
            DataTable::from_columns([("a", vec![0.5, 1.0]), ("b", vec![0.01])]).unwrap();

        let mut importer = RateImporter::new(&model, &table, 2.0);
        importer.assign_concentrations("S", "a").unwrap();
        assert_eq!(
            importer.assign_rates("P", "b").unwrap_err(),
            ExperimentError::ColumnLength {
                column: "b".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rate_import_without_data() {
        let model = model();
        let table = DataTable::new();
        let importer = RateImporter::new(&model, &table, 0.0);
        assert_eq!(importer.build(true).unwrap_err(), ExperimentError::NoData);
    }
}
