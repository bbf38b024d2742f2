use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use menucast_core::error::{ForecastError, Result};

/// Checkpoint stem of the graph embedding model (`.mpk` is appended).
pub const EMBEDDING_CHECKPOINT: &str = "time_stamp_model";
/// Checkpoint stem of the regression head.
pub const HEAD_CHECKPOINT: &str = "regression_model";

pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Paths of both checkpoint files inside `run_dir`.
pub fn checkpoint_files(run_dir: &Path) -> (PathBuf, PathBuf) {
    (
        run_dir.join(EMBEDDING_CHECKPOINT).with_extension("mpk"),
        run_dir.join(HEAD_CHECKPOINT).with_extension("mpk"),
    )
}

/// True when both checkpoint files exist in `run_dir`.
pub fn has_checkpoint(run_dir: &Path) -> bool {
    let (embedding, head) = checkpoint_files(run_dir);
    embedding.is_file() && head.is_file()
}

/// Write `module` to `<run_dir>/<stem>.mpk`, replacing any previous file.
pub fn save_module<B: Backend, M: Module<B>>(module: &M, run_dir: &Path, stem: &str) -> Result<()> {
    let path = run_dir.join(stem);
    module
        .clone()
        .save_file(path.clone(), &CheckpointRecorder::new())
        .map_err(|e| ForecastError::Record(format!("saving {}: {e}", path.display())))
}

/// Restore the parameters of `module` from `<run_dir>/<stem>.mpk`.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    run_dir: &Path,
    stem: &str,
    device: &B::Device,
) -> Result<M> {
    let path = run_dir.join(stem);
    module
        .load_file(path.clone(), &CheckpointRecorder::new(), device)
        .map_err(|e| ForecastError::Record(format!("loading {}: {e}", path.display())))
}

/// Best validation loss seen so far.
///
/// Only a strictly lower loss counts as an improvement, so ties and NaN
/// never trigger a save.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestCheckpoint {
    loss: f64,
    epoch: Option<usize>,
}

impl Default for BestCheckpoint {
    fn default() -> Self {
        Self {
            loss: f64::INFINITY,
            epoch: None,
        }
    }
}

impl BestCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `loss` for `epoch`; returns whether it is a new best.
    pub fn improve(&mut self, loss: f64, epoch: usize) -> bool {
        if loss < self.loss {
            self.loss = loss;
            self.epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }
}
