//! # menucast-examples utilities
//!
//! Synthetic demand data for trying the forecaster without a real menu
//! history, plus the device dispatch ([`run_on_device`]) shared by the
//! example binaries.
//!
//! Entities sit on a ring; each one has a weekly demand cycle with its own
//! phase and level, and leaks a fraction of its neighbours' demand. Snapshots
//! are sliding windows: the features of timestamp `t` are the `F` days
//! starting at `t` and its labels are the `P` days that follow.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::AutodiffBackend;
use indexmap::IndexMap;
use menucast_core::backend::DeviceKind;
use menucast_models::{dense_adjacency, ring_graph};
use menucast_trainer::{ForecastDataset, Split};
use ndarray::{Array2, Array3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Work generic over the training backend, run by [`run_on_device`].
pub trait BackendTask {
    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<()>;
}

/// Initialise the device `kind` names and run `task` on its backend.
pub fn run_on_device<T: BackendTask>(kind: DeviceKind, task: T) -> Result<()> {
    match kind {
        DeviceKind::Cpu => {
            let device = menucast_core::backend::init_cpu_device();
            task.run::<menucast_core::backend::CpuTrainBackend>(device)
        }
        #[cfg(feature = "gpu")]
        DeviceKind::Gpu => {
            let device = menucast_core::backend::init_gpu_device();
            task.run::<menucast_core::backend::WgpuTrainBackend>(device)
        }
        #[cfg(not(feature = "gpu"))]
        DeviceKind::Gpu => anyhow::bail!("built without the `gpu` feature"),
    }
}

pub const ENTITY_DICT_FILE: &str = "entities.json";
pub const DATE_DICT_FILE: &str = "dates.json";

/// Shape and noise of a synthetic demand history.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub num_entities: usize,
    pub num_days: usize,
    /// Days of history per snapshot (`F`).
    pub window: usize,
    /// Days forecast per snapshot (`P`).
    pub horizon: usize,
    /// Share of snapshots used for training.
    pub train_fraction: f32,
    /// Weight of the neighbours' demand in each entity's demand.
    pub coupling: f32,
    pub noise: f32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_entities: 12,
            num_days: 180,
            window: 14,
            horizon: 7,
            train_fraction: 0.8,
            coupling: 0.2,
            noise: 0.1,
            seed: 42,
        }
    }
}

/// A generated dataset with its lookup tables.
#[derive(Debug, Clone)]
pub struct SyntheticDemand {
    pub dataset: ForecastDataset,
    pub entities: IndexMap<String, u64>,
    pub dates: IndexMap<String, u64>,
    /// Position in `dates` of the first test snapshot's first day.
    pub test_start: usize,
}

impl SyntheticDemand {
    /// Write the `.npy` arrays and both dictionaries into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.dataset
            .save_dir(dir)
            .with_context(|| format!("writing dataset to {}", dir.display()))?;
        write_json(&dir.join(ENTITY_DICT_FILE), &self.entities)?;
        write_json(&dir.join(DATE_DICT_FILE), &self.dates)?;
        Ok(())
    }
}

fn write_json(path: &Path, map: &IndexMap<String, u64>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), map)
        .with_context(|| format!("writing {}", path.display()))
}

/// Daily demand `[num_days, num_entities]`.
fn demand_history(config: &SyntheticConfig, adjacency: &[f32]) -> Array2<f32> {
    let n = config.num_entities;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let levels: Vec<f32> = (0..n).map(|_| rng.gen_range(2.0..6.0)).collect();
    let phases: Vec<f32> = (0..n).map(|_| rng.gen_range(0.0..TAU)).collect();

    let mut own = Array2::<f32>::zeros((config.num_days, n));
    for day in 0..config.num_days {
        for e in 0..n {
            let weekly = (TAU * day as f32 / 7.0 + phases[e]).sin();
            let noise = rng.gen_range(-1.0..1.0) * config.noise;
            own[[day, e]] = levels[e] + weekly + noise;
        }
    }

    let mut demand = own.clone();
    for day in 0..config.num_days {
        for e in 0..n {
            let neighbours: f32 = (0..n).map(|j| adjacency[e * n + j] * own[[day, j]]).sum();
            demand[[day, e]] += config.coupling * neighbours;
        }
    }
    demand
}

fn windows(
    demand: &Array2<f32>,
    starts: std::ops::Range<usize>,
    window: usize,
    horizon: usize,
) -> Result<Split> {
    let n = demand.dim().1;
    let t = starts.len();
    let first = starts.start;
    let data = Array3::from_shape_fn((t, n, window), |(ts, e, d)| demand[[first + ts + d, e]]);
    let labels = Array3::from_shape_fn((t, n, horizon), |(ts, e, p)| {
        demand[[first + ts + window + p, e]]
    });
    Ok(Split::new(data, labels)?)
}

/// Generate a ring-graph demand dataset.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticDemand> {
    ensure!(config.num_entities > 1, "need at least two entities");
    ensure!(config.window > 0 && config.horizon > 0, "window and horizon must be positive");
    ensure!(
        config.num_days >= config.window + config.horizon + 1,
        "{} days cannot hold two snapshots of {} + {} days",
        config.num_days,
        config.window,
        config.horizon
    );

    let adjacency = dense_adjacency(&ring_graph(config.num_entities));
    let demand = demand_history(config, &adjacency);

    let snapshots = config.num_days - config.window - config.horizon + 1;
    let train_count = ((snapshots as f32 * config.train_fraction) as usize).clamp(1, snapshots - 1);

    let train = windows(&demand, 0..train_count, config.window, config.horizon)?;
    let test = windows(&demand, train_count..snapshots, config.window, config.horizon)?;
    let n = config.num_entities;
    let adjacency = Array2::from_shape_vec((n, n), adjacency)?;
    let dataset = ForecastDataset::new(train, test, adjacency)?;

    let entities = (0..n).map(|i| (format!("item_{i:03}"), i as u64)).collect();
    // enough labels for a report starting anywhere in the test window
    let test_rows = (snapshots - train_count) * config.horizon;
    let num_dates = config.num_days.max(train_count + 30 + test_rows);
    let dates = (0..num_dates).map(|d| (format!("day_{d:04}"), d as u64)).collect();

    log::info!(
        "synthetic demand: {n} entities, {} train / {} test snapshots",
        train_count,
        snapshots - train_count
    );
    Ok(SyntheticDemand {
        dataset,
        entities,
        dates,
        test_start: train_count,
    })
}

/// Load a dataset directory, generating synthetic data into it first when
/// it holds no arrays.
pub fn load_or_generate(dir: &Path, synthetic: &SyntheticConfig) -> Result<ForecastDataset> {
    if !dir.join(menucast_trainer::dataset::TRAIN_DATA_FILE).is_file() {
        log::info!("no dataset in {}, generating one", dir.display());
        generate(synthetic)?.save(dir)?;
    }
    ForecastDataset::load_dir(dir).with_context(|| format!("loading dataset from {}", dir.display()))
}

/// Dictionary paths inside a generated dataset directory.
pub fn dictionary_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(ENTITY_DICT_FILE), dir.join(DATE_DICT_FILE))
}
