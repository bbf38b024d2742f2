//! # menucast-models
//!
//! The two differentiable collaborators of the forecasting pipeline.
//!
//! The trainer only relies on the [`NodeEmbedding`] and [`ForecastHead`]
//! contracts: one maps a timestamp's node features `[N, F]` to embeddings
//! `[N, D]`, the other maps embeddings to a forecast horizon `[N, P]`. Any
//! burn [`Module`](burn::module::Module) implementing them can be trained.
//!
//! Reference implementations:
//!
//! - [`GraphEmbedding`]: stacked graph convolutions over the symmetric
//!   normalised adjacency
//! - [`RegressionHead`]: a linear projection onto the horizon
//!
//! ## Graph utilities
//!
//! - [`normalize_adjacency`]: `D^-1/2 (A + I) D^-1/2`
//! - [`ring_graph`] / [`dense_adjacency`]: petgraph helpers for synthetic graphs
//!
//! ```rust,ignore
//! use menucast_models::{GraphEmbeddingConfig, RegressionHeadConfig, adjacency_tensor};
//!
//! let adjacency = adjacency_tensor::<B>(&adj, n, &device)?;
//! let embedder = GraphEmbeddingConfig::new(features, features)
//!     .with_num_layers(2)
//!     .init(adjacency, &device);
//! let head = RegressionHeadConfig::new(features, horizon).init(&device);
//! let forecast = head.regress(embedder.embed(snapshot));
//! ```

pub mod gnn;
pub mod graph_utils;
pub mod regression;

pub use gnn::*;
pub use graph_utils::*;
pub use regression::*;

use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

/// Per-timestamp graph model: node features `[N, F]` to embeddings `[N, D]`.
///
/// Implementations see the whole timestamp; node batching happens on the
/// loss side only.
pub trait NodeEmbedding<B: Backend>: Module<B> {
    fn embed(&self, features: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Regression head: embeddings `[N, D]` to forecasts `[N, P]`.
pub trait ForecastHead<B: Backend>: Module<B> {
    fn regress(&self, embeddings: Tensor<B, 2>) -> Tensor<B, 2>;
}
