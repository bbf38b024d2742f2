use std::fmt;
use std::path::PathBuf;

use menucast_core::metrics::{ForecastMetrics, RunningMinima};

/// Scalars of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    /// Running training loss after this epoch (see `carry_train_loss`).
    pub train_loss: f64,
    pub validation_loss: f64,
    pub metrics: ForecastMetrics,
    /// Learning rate the epoch was trained with.
    pub learning_rate: f64,
    /// Whether this epoch wrote a new checkpoint.
    pub checkpointed: bool,
}

/// Result of [`ForecastPipeline::train`](crate::ForecastPipeline::train).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub run_dir: PathBuf,
    pub run_version: u64,
    pub epochs: Vec<EpochSummary>,
    pub best_epoch: Option<usize>,
    pub best_loss: f64,
    pub minima: RunningMinima,
}

impl TrainingReport {
    pub fn new(run_dir: PathBuf, run_version: u64) -> Self {
        Self {
            run_dir,
            run_version,
            epochs: Vec::new(),
            best_epoch: None,
            best_loss: f64::INFINITY,
            minima: RunningMinima::default(),
        }
    }

    pub fn last(&self) -> Option<&EpochSummary> {
        self.epochs.last()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.epochs.iter().filter(|e| e.checkpointed).count()
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run_{} ({})", self.run_version, self.run_dir.display())?;
        writeln!(f, "  epochs trained: {}", self.epochs.len())?;
        match self.best_epoch {
            Some(epoch) => writeln!(
                f,
                "  best validation loss: {:.6} at epoch {epoch}",
                self.best_loss
            )?,
            None => writeln!(f, "  no checkpoint written")?,
        }
        write!(
            f,
            "  minima: RMSE={:.4} MAE={:.4} MAPE={:.2}%",
            self.minima.rmse, self.minima.mae, self.minima.mape
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_checkpoint() {
        let report = TrainingReport::new(PathBuf::from("/tmp/logs/run_3"), 3);
        let text = report.to_string();
        assert!(text.starts_with("run_3"));
        assert!(text.contains("no checkpoint written"));
        assert_eq!(report.checkpoint_count(), 0);
        assert!(report.last().is_none());
    }
}
