use approx::assert_relative_eq;
use menucast_core::metrics::{mae, mape, per_entity_errors, rmse, ForecastMetrics, RunningMinima};

fn series(len: usize, shift: f32) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.7).sin() * 3.0 + 5.0 + shift).collect()
}

#[test]
fn test_rmse_bounds_mae() {
    let truth = series(50, 0.0);
    let pred: Vec<f32> = truth
        .iter()
        .enumerate()
        .map(|(i, v)| v + if i % 3 == 0 { 2.0 } else { -0.5 })
        .collect();
    let r = rmse(&truth, &pred);
    let m = mae(&truth, &pred);
    assert!(r >= m);
    assert!(m > 0.0);
}

#[test]
fn test_constant_offset() {
    let truth = series(20, 0.0);
    let pred = series(20, 1.5);
    assert_relative_eq!(rmse(&truth, &pred), 1.5, epsilon = 1e-5);
    assert_relative_eq!(mae(&truth, &pred), 1.5, epsilon = 1e-5);
}

#[test]
fn test_mape_zero_truth_is_large_but_finite() {
    let truth = [0.0f32; 4];
    let pred = [1.0f32; 4];
    let value = mape(&truth, &pred);
    assert!(value.is_finite());
    assert!(value > 1e8);
}

#[test]
fn test_per_entity_mean_square_matches_global() {
    // N = 3, P = 2, T = 4
    let truth = series(24, 0.0);
    let pred = series(24, 0.25);
    let errors = per_entity_errors(&truth, &pred, 3, 2);
    assert_eq!(errors.len(), 3);

    // equal row counts per entity, so mean of squared RMSEs = global MSE
    let mean_sq: f32 = errors.rmse.iter().map(|r| r * r).sum::<f32>() / 3.0;
    let global = rmse(&truth, &pred);
    assert_relative_eq!(mean_sq, global * global, epsilon = 1e-5);
}

#[test]
fn test_minima_track_best_epoch_values() {
    let truth = series(10, 0.0);
    let mut minima = RunningMinima::default();
    for shift in [2.0, 0.5, 1.0] {
        minima.update(&ForecastMetrics::compute(&truth, &series(10, shift)));
    }
    assert_relative_eq!(minima.rmse, 0.5, epsilon = 1e-5);
    assert_relative_eq!(minima.mae, 0.5, epsilon = 1e-5);
}
