use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};

use crate::ForecastHead;

#[derive(Config, Debug)]
pub struct RegressionHeadConfig {
    pub embedding_dim: usize,
    /// Forecast horizon `P`.
    pub horizon: usize,
}

impl RegressionHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RegressionHead<B> {
        RegressionHead {
            linear: LinearConfig::new(self.embedding_dim, self.horizon).init(device),
        }
    }
}

/// Linear projection of node embeddings onto the forecast horizon.
#[derive(Module, Debug)]
pub struct RegressionHead<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> RegressionHead<B> {
    pub fn forward(&self, embeddings: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(embeddings)
    }
}

impl<B: Backend> ForecastHead<B> for RegressionHead<B> {
    fn regress(&self, embeddings: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(embeddings)
    }
}
