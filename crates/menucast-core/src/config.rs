//! Trainer configuration.
//!
//! A [`TrainerConfig`] carries every scalar the pipeline needs besides the
//! tensors themselves. Values can come from:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`MENUCAST_*`)
//! 3. A TOML file passed with `--config`
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```
//! use menucast_core::config::TrainerConfig;
//!
//! let config = TrainerConfig::default()
//!     .with_epochs(40)
//!     .with_learning_rate(0.005)
//!     .with_node_batch_size(16);
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Example TOML
//!
//! ```toml
//! epochs = 60
//! learning_rate = 0.01
//! node_batch_size = 32
//! num_gnn_layers = 2
//! work_dir = "/data/menucast"
//! entity_dict_path = "/data/menucast/dish_dict.json"
//! date_dict_path = "/data/menucast/dates_dict.json"
//! ```

use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::DeviceKind;
use crate::error::{ForecastError, Result};

/// Learning-rate step schedule.
///
/// After epoch `e`: halve when `e <= halve_until` and `e % halve_every == 0`,
/// pin to `floor` once `e > halve_until`, otherwise leave the rate alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrScheduleConfig {
    pub halve_every: usize,
    pub halve_until: usize,
    pub floor: f64,
}

impl Default for LrScheduleConfig {
    fn default() -> Self {
        Self {
            halve_every: 8,
            halve_until: 24,
            floor: 1e-4,
        }
    }
}

/// Complete configuration of one forecasting pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Number of message-passing layers in the graph embedding model.
    pub num_gnn_layers: usize,
    /// Epoch bound; training visits epochs `1..epochs`.
    pub epochs: usize,
    /// Initial learning rate.
    pub learning_rate: f64,
    /// Nodes per loss batch within a timestamp.
    pub node_batch_size: usize,
    /// Embedding width; `None` keeps the input feature width.
    pub embedding_dim: Option<usize>,
    /// Global gradient-norm bound applied to each model separately.
    pub grad_clip_norm: f32,
    /// Carry the previous epoch's mean loss into the next epoch's running
    /// total instead of restarting from zero.
    pub carry_train_loss: bool,
    pub device: DeviceKind,
    /// Root under which `logs/run_<n>/` directories are created.
    pub work_dir: PathBuf,
    /// JSON object mapping entity names to node ids.
    pub entity_dict_path: PathBuf,
    /// JSON object mapping date strings to date ids, in calendar order.
    pub date_dict_path: PathBuf,
    /// Seed for timestamp shuffling; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Kept last so it serializes as a trailing TOML table.
    pub schedule: LrScheduleConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        let work_dir = default_work_dir();
        Self {
            num_gnn_layers: 2,
            epochs: 50,
            learning_rate: 0.01,
            node_batch_size: 32,
            embedding_dim: None,
            grad_clip_norm: 5.0,
            carry_train_loss: true,
            device: DeviceKind::Cpu,
            entity_dict_path: work_dir.join("dish_dict.json"),
            date_dict_path: work_dir.join("dates_dict.json"),
            work_dir,
            seed: None,
            schedule: LrScheduleConfig::default(),
        }
    }
}

impl TrainerConfig {
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub const fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub const fn with_node_batch_size(mut self, size: usize) -> Self {
        self.node_batch_size = size;
        self
    }

    pub const fn with_gnn_layers(mut self, layers: usize) -> Self {
        self.num_gnn_layers = layers;
        self
    }

    pub const fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = Some(dim);
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub const fn with_device(mut self, device: DeviceKind) -> Self {
        self.device = device;
        self
    }

    pub const fn with_carry_train_loss(mut self, carry: bool) -> Self {
        self.carry_train_loss = carry;
        self
    }

    pub fn with_work_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.work_dir = path.into();
        self
    }

    pub fn with_dictionaries<P: Into<PathBuf>, Q: Into<PathBuf>>(
        mut self,
        entity_dict: P,
        date_dict: Q,
    ) -> Self {
        self.entity_dict_path = entity_dict.into();
        self.date_dict_path = date_dict.into();
        self
    }

    /// Directory holding every run of this working directory.
    pub fn log_root(&self) -> PathBuf {
        self.work_dir.join("logs")
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.node_batch_size == 0 {
            return Err(ForecastError::Config(
                "node_batch_size must be positive".into(),
            ));
        }
        if self.num_gnn_layers == 0 {
            return Err(ForecastError::Config(
                "num_gnn_layers must be positive".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ForecastError::Config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.embedding_dim == Some(0) {
            return Err(ForecastError::Config(
                "embedding_dim must be positive".into(),
            ));
        }
        if self.schedule.halve_every == 0 {
            return Err(ForecastError::Config(
                "schedule.halve_every must be positive".into(),
            ));
        }
        if !self.device.is_available() {
            return Err(ForecastError::Config(format!(
                "device '{}' is not available in this build (enable the `gpu` feature)",
                self.device
            )));
        }
        Ok(())
    }

    /// Load a configuration file; missing keys fall back to defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ForecastError::io(path, e))?;
        toml::from_str(&contents).map_err(|e| ForecastError::parse(path, e))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).map_err(|e| ForecastError::parse(path, e))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ForecastError::io(parent, e))?;
        }
        fs::write(path, toml_str).map_err(|e| ForecastError::io(path, e))
    }
}

/// Default working directory: the platform data dir, or `./menucast`.
pub fn default_work_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "menucast") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        log::warn!("no platform data directory, using {}", cwd.display());
        cwd.join("menucast")
    }
}

/// CLI arguments layered over a [`TrainerConfig`].
///
/// Flatten this into a binary's own parser with `#[command(flatten)]`.
#[derive(Parser, Debug, Clone, Default)]
pub struct TrainerArgs {
    /// TOML file with base settings
    #[arg(long, env = "MENUCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Working directory; runs go to <work-dir>/logs/run_<n>
    #[arg(long, env = "MENUCAST_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Number of training epochs (training covers epochs 1..EPOCHS)
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Initial learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Nodes per loss batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Graph message-passing layers
    #[arg(long)]
    pub gnn_layers: Option<usize>,

    /// Embedding width (defaults to the feature width)
    #[arg(long)]
    pub embedding_dim: Option<usize>,

    /// Tensor device
    #[arg(long, value_enum)]
    pub device: Option<DeviceKind>,

    /// JSON entity dictionary (name -> id)
    #[arg(long, env = "MENUCAST_ENTITY_DICT")]
    pub entity_dict: Option<PathBuf>,

    /// JSON date dictionary (date -> id)
    #[arg(long, env = "MENUCAST_DATE_DICT")]
    pub date_dict: Option<PathBuf>,

    /// Seed for timestamp shuffling (random when omitted)
    #[arg(long, env = "MENUCAST_SEED")]
    pub seed: Option<u64>,

    /// Reset the training-loss total at every epoch
    #[arg(long)]
    pub reset_train_loss: bool,
}

impl TrainerArgs {
    /// Resolve the final configuration: CLI > env > file > defaults.
    pub fn into_config(self) -> Result<TrainerConfig> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::from_toml_file(path)?,
            None => TrainerConfig::default(),
        };

        if let Some(dir) = self.work_dir {
            config.work_dir = dir;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(lr) = self.lr {
            config.learning_rate = lr;
        }
        if let Some(size) = self.batch_size {
            config.node_batch_size = size;
        }
        if let Some(layers) = self.gnn_layers {
            config.num_gnn_layers = layers;
        }
        if self.embedding_dim.is_some() {
            config.embedding_dim = self.embedding_dim;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(path) = self.entity_dict {
            config.entity_dict_path = path;
        }
        if let Some(path) = self.date_dict {
            config.date_dict_path = path;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.reset_train_loss {
            config.carry_train_loss = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule, LrScheduleConfig::default());
        assert!(config.carry_train_loss);
        assert_eq!(config.grad_clip_norm, 5.0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = TrainerConfig::default()
            .with_node_batch_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
    }

    #[test]
    fn test_bad_learning_rate_rejected() {
        assert!(TrainerConfig::default()
            .with_learning_rate(0.0)
            .validate()
            .is_err());
        assert!(TrainerConfig::default()
            .with_learning_rate(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_log_root() {
        let config = TrainerConfig::default().with_work_dir("/tmp/menucast-test");
        assert_eq!(config.log_root(), Path::new("/tmp/menucast-test/logs"));
    }

    #[test]
    fn test_toml_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainer.toml");

        let config = TrainerConfig::default()
            .with_epochs(12)
            .with_seed(9)
            .with_work_dir(dir.path());
        config.save_to_file(&path).unwrap();
        assert_eq!(TrainerConfig::from_toml_file(&path).unwrap(), config);

        fs::write(&path, "epochs = 7\nnode_batch_size = 3\n").unwrap();
        let partial = TrainerConfig::from_toml_file(&path).unwrap();
        assert_eq!(partial.epochs, 7);
        assert_eq!(partial.node_batch_size, 3);
        assert_eq!(partial.learning_rate, 0.01);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainer.toml");
        fs::write(&path, "epochs = 7\nlearning_rate = 0.5\n").unwrap();

        let args = TrainerArgs {
            config: Some(path),
            epochs: Some(3),
            reset_train_loss: true,
            ..Default::default()
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.learning_rate, 0.5);
        assert!(!config.carry_train_loss);
    }
}
