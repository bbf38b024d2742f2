//! JSON-lines event stream stored next to a run's checkpoints.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use menucast_core::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

use crate::observer::ScalarObserver;

pub const EVENTS_FILE_NAME: &str = "events.jsonl";

/// One recorded scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub tag: String,
    pub step: usize,
    pub value: f64,
}

/// Appends [`ScalarEvent`]s to `<run_dir>/events.jsonl`.
///
/// Opening an existing stream appends to it, so a resumed run keeps its
/// earlier history.
#[derive(Debug)]
pub struct EventFileWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EventFileWriter {
    pub fn create(run_dir: &Path) -> Result<Self> {
        let path = run_dir.join(EVENTS_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ForecastError::io(&path, e))?;
        log::debug!("writing events to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScalarObserver for EventFileWriter {
    fn record(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let event = ScalarEvent {
            tag: tag.to_string(),
            step,
            value,
        };
        // serde_json writes non-finite floats as null
        let line = serde_json::to_string(&event)
            .map_err(|e| ForecastError::parse(&self.path, e))?;
        writeln!(self.writer, "{line}").map_err(|e| ForecastError::io(&self.path, e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ForecastError::io(&self.path, e))
    }
}

impl Drop for EventFileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("failed to flush {}: {e}", self.path.display());
        }
    }
}

#[derive(Deserialize)]
struct RawEvent {
    tag: String,
    step: usize,
    value: Option<f64>,
}

/// Read every event of the stream in `run_dir`, in write order.
///
/// Values written as `null` (non-finite at record time) come back as NaN.
pub fn read_events(run_dir: &Path) -> Result<Vec<ScalarEvent>> {
    let path = run_dir.join(EVENTS_FILE_NAME);
    let file = File::open(&path).map_err(|e| ForecastError::io(&path, e))?;

    let mut events = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ForecastError::io(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawEvent = serde_json::from_str(&line)
            .map_err(|e| ForecastError::parse(&path, format!("line {}: {e}", lineno + 1)))?;
        events.push(ScalarEvent {
            tag: raw.tag,
            step: raw.step,
            value: raw.value.unwrap_or(f64::NAN),
        });
    }
    Ok(events)
}

/// Events of a single tag, in write order.
pub fn read_series(run_dir: &Path, tag: &str) -> Result<Vec<(usize, f64)>> {
    Ok(read_events(run_dir)?
        .into_iter()
        .filter(|e| e.tag == tag)
        .map(|e| (e.step, e.value))
        .collect())
}
