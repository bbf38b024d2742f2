use std::path::PathBuf;

/// Errors surfaced by the forecasting pipeline.
///
/// None of these are retried; every variant aborts the current operation.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// Invalid or missing configuration, including a `test()` call with no
    /// checkpoint path and no active run.
    #[error("configuration error: {0}")]
    Config(String),

    /// Tensor shapes disagree between data, labels, adjacency or splits.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Filesystem failure (run directory creation, reports, dictionaries).
    #[error("i/o error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A checkpoint could not be written or restored.
    #[error("checkpoint error: {0}")]
    Record(String),

    /// A dictionary or data file could not be parsed.
    #[error("malformed input {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Tensor data could not be read back to host memory.
    #[error("tensor readback failed: {0}")]
    Tensor(String),

    /// Reporting could not align predictions with entities or dates.
    #[error("report error: {0}")]
    Report(String),
}

impl ForecastError {
    /// Wrap an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = ForecastError> = std::result::Result<T, E>;
