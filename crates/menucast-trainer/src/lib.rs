//! # menucast-trainer
//!
//! Training, evaluation and reporting for the graph demand forecaster.
//!
//! [`ForecastPipeline`] owns both models and the uploaded datasets. One
//! `train()` call allocates a run directory under `<work_dir>/logs/`, runs
//! epochs `1..epochs` and keeps the checkpoint with the lowest validation
//! loss; `test()` reloads a checkpoint and writes per-entity CSV tables.
//!
//! ```rust,ignore
//! use menucast_core::backend::{init_cpu_device, CpuTrainBackend};
//! use menucast_trainer::{ForecastDataset, GraphForecastPipeline};
//!
//! let dataset = ForecastDataset::load_dir(&data_dir)?;
//! let mut pipeline =
//!     GraphForecastPipeline::<CpuTrainBackend>::new(config, &dataset, init_cpu_device())?;
//! let report = pipeline.train()?;
//! println!("{report}");
//! pipeline.test(test_start, None, 30)?;
//! ```
//!
//! ## Modules
//!
//! - [`dataset`]: `.npy` dataset directories and device upload
//! - [`batching`]: node batches within a timestamp
//! - [`schedule`]: epoch-wise learning-rate steps
//! - [`clip`]: global gradient-norm clipping
//! - [`checkpoint`]: best-loss tracking and recorder files
//! - [`run`]: run directory allocation
//! - [`evaluation`]: gradient-free pass over the test split
//! - [`report`]: CSV reports keyed by entity name and date

pub mod batching;
pub mod checkpoint;
pub mod clip;
pub mod dataset;
pub mod evaluation;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod schedule;
pub mod summary;

pub use batching::node_batches;
pub use checkpoint::BestCheckpoint;
pub use dataset::{DeviceSplit, ForecastDataset, Split};
pub use evaluation::EvaluationOutput;
pub use pipeline::{ForecastPipeline, GraphForecastPipeline};
pub use report::ForecastReport;
pub use run::{CounterFileAllocator, DirCountAllocator, RunAllocator, RunDirectory};
pub use summary::{EpochSummary, TrainingReport};
