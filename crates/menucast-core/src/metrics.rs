//! Forecast error metrics.
//!
//! All reducers flatten their inputs: a `[timestamps × entities × horizon]`
//! block is just a slice of `f32`. Sums are accumulated in `f64` and the
//! result is narrowed back to `f32`.
//!
//! - **RMSE**: `sqrt(mean((y - ŷ)²))`
//! - **MAE**: `mean(|y - ŷ|)`
//! - **MAPE**: `mean(|(y - ŷ) / (y + ε)|) × 100` with `ε = 1e-7`
//!
//! MAPE's epsilon keeps zero-demand days from dividing by zero, at the cost
//! of huge values on those days. That bias is intentional and left as is.
//!
//! ## Per-entity decomposition
//!
//! Evaluation emits rows timestamp-major: entity `i` at timestamp `t` is row
//! `t * num_entities + i`, each row holding `horizon` values.
//! [`per_entity_errors`] walks those strided rows for every entity.
//!
//! ```
//! use menucast_core::metrics::entity_rows;
//!
//! // 3 entities, 2 timestamps, horizon 1
//! let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! assert_eq!(entity_rows(&flat, 3, 1, 0), vec![1.0, 4.0]);
//! assert_eq!(entity_rows(&flat, 3, 1, 2), vec![3.0, 6.0]);
//! ```

/// Denominator guard for [`mape`].
pub const MAPE_EPSILON: f64 = 1e-7;

/// Root mean squared error over all elements.
///
/// Returns NaN for empty input or when any element is NaN.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn rmse(y_true: &[f32], y_pred: &[f32]) -> f32 {
    mean_of(y_true, y_pred, |d| d * d).sqrt() as f32
}

/// Mean absolute error over all elements.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn mae(y_true: &[f32], y_pred: &[f32]) -> f32 {
    mean_of(y_true, y_pred, f64::abs) as f32
}

/// Mean absolute percentage error, in percent.
///
/// A zero truth contributes `|ŷ| / 1e-7 × 100` instead of failing.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn mape(y_true: &[f32], y_pred: &[f32]) -> f32 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "y_true and y_pred must have the same length"
    );
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let t = f64::from(t);
            ((t - f64::from(p)) / (t + MAPE_EPSILON)).abs()
        })
        .sum();
    (total / y_true.len() as f64 * 100.0) as f32
}

fn mean_of(y_true: &[f32], y_pred: &[f32], f: impl Fn(f64) -> f64) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "y_true and y_pred must have the same length"
    );
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| f(f64::from(t) - f64::from(p)))
        .sum();
    total / y_true.len() as f64
}

/// Collect the rows belonging to `entity` from a timestamp-major flat sequence.
///
/// # Panics
///
/// Panics if `num_entities` or `horizon` is zero, or if `flat` does not hold
/// a whole number of rows.
pub fn entity_rows(flat: &[f32], num_entities: usize, horizon: usize, entity: usize) -> Vec<f32> {
    assert!(num_entities > 0, "num_entities must be positive");
    assert!(horizon > 0, "horizon must be positive");
    assert_eq!(
        flat.len() % horizon,
        0,
        "flat length {} is not a multiple of horizon {}",
        flat.len(),
        horizon
    );

    flat.chunks_exact(horizon)
        .skip(entity)
        .step_by(num_entities)
        .flatten()
        .copied()
        .collect()
}

/// Per-entity RMSE and MAE, index-aligned to entity order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityErrors {
    pub rmse: Vec<f32>,
    /// Mean absolute error per entity.
    ///
    /// The field keeps the `mse` name used by the `rmse_mse.csv` artifact even
    /// though the value is MAE.
    pub mse: Vec<f32>,
}

impl EntityErrors {
    pub fn len(&self) -> usize {
        self.rmse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rmse.is_empty()
    }
}

/// Decompose errors by entity over interleaved evaluation output.
///
/// # Panics
///
/// Panics under the same conditions as [`entity_rows`], or when the slices
/// differ in length.
pub fn per_entity_errors(
    y_true: &[f32],
    y_pred: &[f32],
    num_entities: usize,
    horizon: usize,
) -> EntityErrors {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "y_true and y_pred must have the same length"
    );

    let mut errors = EntityErrors {
        rmse: Vec::with_capacity(num_entities),
        mse: Vec::with_capacity(num_entities),
    };
    for entity in 0..num_entities {
        let truth = entity_rows(y_true, num_entities, horizon, entity);
        let pred = entity_rows(y_pred, num_entities, horizon, entity);
        errors.rmse.push(rmse(&truth, &pred));
        errors.mse.push(mae(&truth, &pred));
    }
    errors
}

/// Validation scalars computed once per epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastMetrics {
    pub rmse: f32,
    pub mae: f32,
    pub mape: f32,
}

impl ForecastMetrics {
    pub fn compute(y_true: &[f32], y_pred: &[f32]) -> Self {
        Self {
            rmse: rmse(y_true, y_pred),
            mae: mae(y_true, y_pred),
            mape: mape(y_true, y_pred),
        }
    }
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RMSE={:.4} MAE={:.4} MAPE={:.2}%",
            self.rmse, self.mae, self.mape
        )
    }
}

/// Running minima of the validation metrics across epochs.
///
/// Only reported; checkpoint selection is keyed on loss alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunningMinima {
    pub rmse: f32,
    pub mae: f32,
    pub mape: f32,
}

impl Default for RunningMinima {
    fn default() -> Self {
        Self {
            rmse: f32::INFINITY,
            mae: f32::INFINITY,
            mape: f32::INFINITY,
        }
    }
}

impl RunningMinima {
    pub fn update(&mut self, metrics: &ForecastMetrics) {
        self.rmse = self.rmse.min(metrics.rmse);
        self.mae = self.mae.min(metrics.mae);
        self.mape = self.mape.min(metrics.mape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_inputs_have_zero_error() {
        let x = [0.5, 3.0, -2.0, 10.0];
        assert_eq!(rmse(&x, &x), 0.0);
        assert_eq!(mae(&x, &x), 0.0);
        assert_eq!(mape(&x, &x), 0.0);
    }

    #[test]
    fn test_rmse_and_mae_values() {
        let t = [1.0, 2.0, 3.0, 4.0];
        let p = [2.0, 2.0, 1.0, 4.0];
        // squared: 1, 0, 4, 0 -> mean 1.25
        assert_relative_eq!(rmse(&t, &p), 1.25f32.sqrt(), epsilon = 1e-6);
        // abs: 1, 0, 2, 0 -> mean 0.75
        assert_relative_eq!(mae(&t, &p), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_metrics_non_negative() {
        let t = [-3.0, 7.5, 0.0, 1.0];
        let p = [2.0, -1.0, 4.0, 1.0];
        assert!(rmse(&t, &p) >= 0.0);
        assert!(mae(&t, &p) >= 0.0);
    }

    #[test]
    fn test_mape_percent() {
        let t = [100.0, 200.0];
        let p = [110.0, 180.0];
        // 10% and 10%
        assert_relative_eq!(mape(&t, &p), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_mape_zero_truth_is_large_but_finite() {
        let t = [0.0, 0.0, 0.0];
        let p = [1.0, 2.0, 0.5];
        let value = mape(&t, &p);
        assert!(value.is_finite());
        assert!(value > 1e8);
    }

    #[test]
    fn test_nan_propagates() {
        let t = [1.0, f32::NAN];
        let p = [1.0, 2.0];
        assert!(rmse(&t, &p).is_nan());
        assert!(mae(&t, &p).is_nan());
    }

    #[test]
    fn test_empty_is_nan() {
        assert!(rmse(&[], &[]).is_nan());
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_length_mismatch_panics() {
        rmse(&[1.0, 2.0], &[1.0]);
    }

    #[test]
    fn test_entity_rows_interleaved() {
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(entity_rows(&flat, 3, 1, 0), vec![1.0, 4.0]);
        assert_eq!(entity_rows(&flat, 3, 1, 1), vec![2.0, 5.0]);
        assert_eq!(entity_rows(&flat, 3, 1, 2), vec![3.0, 6.0]);
    }

    #[test]
    fn test_entity_rows_with_horizon() {
        // 2 entities, 2 timestamps, horizon 2
        let flat = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5];
        assert_eq!(entity_rows(&flat, 2, 2, 0), vec![1.0, 1.5, 3.0, 3.5]);
        assert_eq!(entity_rows(&flat, 2, 2, 1), vec![2.0, 2.5, 4.0, 4.5]);
    }

    #[test]
    fn test_per_entity_single_entity_matches_global() {
        let t = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let p = [1.5, 2.0, 2.0, 4.5, 5.0, 8.0];
        let errors = per_entity_errors(&t, &p, 1, 2);
        assert_eq!(errors.len(), 1);
        assert_relative_eq!(errors.rmse[0], rmse(&t, &p), epsilon = 1e-6);
        assert_relative_eq!(errors.mse[0], mae(&t, &p), epsilon = 1e-6);
    }

    #[test]
    fn test_per_entity_errors_are_index_aligned() {
        // entity 0 perfect, entity 1 off by 2 everywhere
        let t = [1.0, 1.0, 2.0, 2.0];
        let p = [1.0, 3.0, 2.0, 4.0];
        let errors = per_entity_errors(&t, &p, 2, 1);
        assert_eq!(errors.rmse, vec![0.0, 2.0]);
        assert_eq!(errors.mse, vec![0.0, 2.0]);
    }

    #[test]
    fn test_running_minima() {
        let mut minima = RunningMinima::default();
        minima.update(&ForecastMetrics { rmse: 2.0, mae: 1.0, mape: 30.0 });
        minima.update(&ForecastMetrics { rmse: 3.0, mae: 0.5, mape: 40.0 });
        assert_eq!(minima, RunningMinima { rmse: 2.0, mae: 0.5, mape: 30.0 });
    }
}
