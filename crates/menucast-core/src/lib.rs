//! # menucast-core
//!
//! Foundational pieces shared by every menucast crate:
//!
//! - [`backend`]: burn backend aliases and device selection
//! - [`config`]: [`TrainerConfig`] plus CLI/TOML layering
//! - [`error`]: the [`ForecastError`] type returned across the workspace
//! - [`metrics`]: RMSE / MAE / MAPE and per-entity error decomposition
//! - [`rng`]: splittable [`RngKey`] used for timestamp shuffling
//!
//! ```
//! use menucast_core::metrics::{mae, rmse};
//!
//! let truth = [1.0, 2.0, 3.0];
//! let pred = [1.0, 2.0, 5.0];
//! assert!((mae(&truth, &pred) - 2.0 / 3.0).abs() < 1e-6);
//! assert!(rmse(&truth, &pred) > mae(&truth, &pred));
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rng;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use rng::*;
