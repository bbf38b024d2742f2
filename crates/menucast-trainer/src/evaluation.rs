use burn::nn::loss::{MseLoss, Reduction};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use menucast_core::error::{ForecastError, Result};
use menucast_core::metrics::ForecastMetrics;
use menucast_models::{ForecastHead, NodeEmbedding};

use crate::dataset::DeviceSplit;

/// Flat outputs of one pass over the test split.
///
/// `labels` and `predictions` hold one `[N, P]` block per visited timestamp,
/// concatenated in visit order, so entity `i`'s rows sit at row positions
/// `i, i + N, i + 2N, ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutput {
    pub labels: Vec<f32>,
    pub predictions: Vec<f32>,
    /// Mean over timestamps of `MSE(logits, labels) / N`.
    pub loss: f64,
    /// Test timestamps in the order they were visited.
    pub order: Vec<usize>,
    pub num_entities: usize,
    pub horizon: usize,
}

impl EvaluationOutput {
    pub fn metrics(&self) -> ForecastMetrics {
        ForecastMetrics::compute(&self.labels, &self.predictions)
    }

    /// Same output with the timestamp blocks sorted by timestamp index.
    pub fn in_timestamp_order(&self) -> Self {
        let block = self.num_entities * self.horizon;
        let mut visits: Vec<(usize, usize)> = self.order.iter().copied().enumerate().collect();
        visits.sort_by_key(|&(_, timestamp)| timestamp);

        let mut labels = Vec::with_capacity(self.labels.len());
        let mut predictions = Vec::with_capacity(self.predictions.len());
        for &(position, _) in &visits {
            let range = position * block..(position + 1) * block;
            labels.extend_from_slice(&self.labels[range.clone()]);
            predictions.extend_from_slice(&self.predictions[range]);
        }

        Self {
            labels,
            predictions,
            loss: self.loss,
            order: visits.into_iter().map(|(_, t)| t).collect(),
            num_entities: self.num_entities,
            horizon: self.horizon,
        }
    }
}

/// Forward pass over `split` in `order` with no parameter updates.
pub fn evaluate_split<B, E, R>(
    embedder: &E,
    head: &R,
    split: &DeviceSplit<B>,
    order: Vec<usize>,
) -> Result<EvaluationOutput>
where
    B: Backend,
    E: NodeEmbedding<B>,
    R: ForecastHead<B>,
{
    let [_, num_entities, _] = split.data.dims();
    let [_, _, horizon] = split.labels.dims();
    let mse = MseLoss::new();

    let mut labels = Vec::with_capacity(order.len() * num_entities * horizon);
    let mut predictions = Vec::with_capacity(labels.capacity());
    let mut total = 0.0f64;

    for &index in &order {
        let (data, label) = split.timestamp(index);
        let logits = head.regress(embedder.embed(data));
        let loss: Tensor<B, 1> = mse
            .forward(logits.clone(), label.clone(), Reduction::Mean)
            .div_scalar(num_entities as f64);
        total += loss.into_scalar().elem::<f64>();

        labels.extend(read_back(label)?);
        predictions.extend(read_back(logits)?);
    }

    Ok(EvaluationOutput {
        labels,
        predictions,
        loss: total / order.len() as f64,
        order,
        num_entities,
        horizon,
    })
}

pub(crate) fn read_back<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ForecastError::Tensor(format!("{e:?}")))
}
