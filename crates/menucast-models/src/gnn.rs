//! Graph convolution embedding model.
//!
//! Each layer computes `H' = Â H W + b` where `Â` is the normalised adjacency
//! built by [`crate::normalize_adjacency`]. ReLU sits between layers; the last
//! layer is linear so embeddings can go negative.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};

use crate::NodeEmbedding;

/// One message-passing layer.
#[derive(Module, Debug)]
pub struct GraphConv<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> GraphConv<B> {
    pub fn new(input_dim: usize, output_dim: usize, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(input_dim, output_dim).init(device),
        }
    }

    /// `adjacency` is `[N, N]`, `features` is `[N, F]`.
    pub fn forward(&self, adjacency: Tensor<B, 2>, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(adjacency.matmul(features))
    }
}

#[derive(Config, Debug)]
pub struct GraphEmbeddingConfig {
    /// Feature width `F` of each node snapshot.
    pub input_dim: usize,
    /// Embedding width `D`.
    pub embedding_dim: usize,
    #[config(default = 2)]
    pub num_layers: usize,
}

impl GraphEmbeddingConfig {
    /// Build the model around a normalised `[N, N]` adjacency.
    ///
    /// The adjacency is a constant of the module: it is not trained and not
    /// written to checkpoints.
    pub fn init<B: Backend>(&self, adjacency: Tensor<B, 2>, device: &B::Device) -> GraphEmbedding<B> {
        let num_layers = self.num_layers.max(1);
        let layers = (0..num_layers)
            .map(|i| {
                let input = if i == 0 { self.input_dim } else { self.embedding_dim };
                GraphConv::new(input, self.embedding_dim, device)
            })
            .collect();

        GraphEmbedding {
            layers,
            adjacency: adjacency.to_device(device),
        }
    }
}

/// Stacked [`GraphConv`] layers sharing one adjacency.
#[derive(Module, Debug)]
pub struct GraphEmbedding<B: Backend> {
    layers: Vec<GraphConv<B>>,
    adjacency: Tensor<B, 2>,
}

impl<B: Backend> GraphEmbedding<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.dims()[0]
    }

    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        let mut hidden = features;
        for (i, layer) in self.layers.iter().enumerate() {
            hidden = layer.forward(self.adjacency.clone(), hidden);
            if i < last {
                hidden = relu(hidden);
            }
        }
        hidden
    }
}

impl<B: Backend> NodeEmbedding<B> for GraphEmbedding<B> {
    fn embed(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::adjacency_tensor;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_embedding_shapes() {
        let device = Default::default();
        let adj = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let adjacency = adjacency_tensor::<B>(&adj, 3, &device).unwrap();

        let model = GraphEmbeddingConfig::new(4, 6)
            .with_num_layers(3)
            .init(adjacency, &device);
        assert_eq!(model.num_layers(), 3);
        assert_eq!(model.num_nodes(), 3);

        let features = Tensor::<B, 2>::ones([3, 4], &device);
        let out = model.embed(features);
        assert_eq!(out.dims(), [3, 6]);
    }

    #[test]
    fn test_adjacency_is_not_a_parameter() {
        let device = Default::default();
        let adjacency = adjacency_tensor::<B>(&[0.0, 1.0, 1.0, 0.0], 2, &device).unwrap();
        let model = GraphEmbeddingConfig::new(3, 3)
            .with_num_layers(1)
            .init(adjacency, &device);
        // one Linear: 3x3 weight + 3 bias
        assert_eq!(model.num_params(), 12);
    }
}
