//! Per-entity prediction tables written after a test pass.
//!
//! Three files land in the run directory:
//!
//! - `prediction.csv` / `actual.csv`: a `Date` column then one column per
//!   entity, one row per forecast day
//! - `rmse_mse.csv`: `dish_name,rmse,mse` per entity, where `mse` holds the
//!   mean absolute error

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use menucast_core::error::{ForecastError, Result};
use menucast_core::metrics::{entity_rows, per_entity_errors, EntityErrors};

use crate::evaluation::EvaluationOutput;

pub const PREDICTION_FILE: &str = "prediction.csv";
pub const ACTUAL_FILE: &str = "actual.csv";
pub const ERRORS_FILE: &str = "rmse_mse.csv";

/// Days between the start of the test window and the first forecast date.
pub const DEFAULT_NUM_DAYS: usize = 30;

/// JSON object `key -> id`, in file order.
pub type Dictionary = IndexMap<String, u64>;

pub fn load_dictionary(path: &Path) -> Result<Dictionary> {
    let file = File::open(path).map_err(|e| ForecastError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ForecastError::parse(path, e))
}

/// Name of every entity id `0..num_entities`, looked up by value.
pub fn entity_names(dictionary: &Dictionary, num_entities: usize) -> Result<Vec<String>> {
    (0..num_entities as u64)
        .map(|id| {
            dictionary
                .iter()
                .find(|&(_, &value)| value == id)
                .map(|(name, _)| name.clone())
                .ok_or_else(|| ForecastError::Report(format!("no entity name for id {id}")))
        })
        .collect()
}

/// `rows` consecutive date keys starting at position `start`.
pub fn report_dates(dictionary: &Dictionary, start: usize, rows: usize) -> Result<Vec<String>> {
    let available = dictionary.len().saturating_sub(start);
    if available < rows {
        return Err(ForecastError::Report(format!(
            "{rows} forecast rows need dates from position {start}, but only {available} remain"
        )));
    }
    Ok(dictionary.keys().skip(start).take(rows).cloned().collect())
}

/// Split an interleaved flat sequence into one column per entity.
///
/// Column `i` concatenates entity `i`'s rows across timestamps.
pub fn deinterleave(flat: &[f32], num_entities: usize, horizon: usize) -> Vec<Vec<f32>> {
    (0..num_entities)
        .map(|entity| entity_rows(flat, num_entities, horizon, entity))
        .collect()
}

/// Everything written by one test pass.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub dates: Vec<String>,
    pub entities: Vec<String>,
    /// One column per entity, `dates.len()` values each.
    pub predictions: Vec<Vec<f32>>,
    pub actual: Vec<Vec<f32>>,
    pub errors: EntityErrors,
}

impl ForecastReport {
    /// Align an evaluation pass with entity names and forecast dates.
    ///
    /// Errors are computed on the visit-ordered output; the tables use
    /// timestamp order so rows line up with dates.
    pub fn build(
        output: &EvaluationOutput,
        entities: &Dictionary,
        dates: &Dictionary,
        first_date: usize,
    ) -> Result<Self> {
        let n = output.num_entities;
        let p = output.horizon;
        let errors = per_entity_errors(&output.labels, &output.predictions, n, p);

        let ordered = output.in_timestamp_order();
        let predictions = deinterleave(&ordered.predictions, n, p);
        let actual = deinterleave(&ordered.labels, n, p);
        let rows = predictions.first().map_or(0, Vec::len);

        Ok(Self {
            dates: report_dates(dates, first_date, rows)?,
            entities: entity_names(entities, n)?,
            predictions,
            actual,
            errors,
        })
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        self.write_table(&dir.join(PREDICTION_FILE), &self.predictions)?;
        self.write_table(&dir.join(ACTUAL_FILE), &self.actual)?;
        self.write_errors(&dir.join(ERRORS_FILE))?;
        log::info!("wrote forecast report to {}", dir.display());
        Ok(())
    }

    fn write_table(&self, path: &Path, columns: &[Vec<f32>]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        let header = std::iter::once("Date").chain(self.entities.iter().map(String::as_str));
        writer.write_record(header).map_err(|e| csv_error(path, e))?;

        for (row, date) in self.dates.iter().enumerate() {
            let mut record = Vec::with_capacity(columns.len() + 1);
            record.push(date.clone());
            record.extend(columns.iter().map(|column| column[row].to_string()));
            writer.write_record(&record).map_err(|e| csv_error(path, e))?;
        }
        writer.flush().map_err(|e| ForecastError::io(path, e))
    }

    fn write_errors(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        writer
            .write_record(["dish_name", "rmse", "mse"])
            .map_err(|e| csv_error(path, e))?;
        for (i, name) in self.entities.iter().enumerate() {
            writer
                .write_record([
                    name.clone(),
                    self.errors.rmse[i].to_string(),
                    self.errors.mse[i].to_string(),
                ])
                .map_err(|e| csv_error(path, e))?;
        }
        writer.flush().map_err(|e| ForecastError::io(path, e))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> ForecastError {
    ForecastError::Report(format!("{}: {e}", path.display()))
}
