//! Regression error statistics

use super::special::median_time;
use super::RegressionStats;
use crate::error::{Result, ResultsError};
use crate::predictions::PredictionLog;

/// Compute MSE, MAE, R², MAPE and the median prediction time
pub fn compute(log: &PredictionLog) -> Result<RegressionStats> {
    if !log.is_finalized() {
        return Err(ResultsError::InvalidState {
            operation: "compute regression stats",
            state: log.state(),
        });
    }
    let truth = log.true_labels()?;
    let predicted = log.predicted_labels()?;
    if truth.is_empty() {
        return Err(ResultsError::EmptyResults);
    }

    Ok(RegressionStats {
        num_instances: truth.len(),
        mse: mse(&truth, &predicted),
        mae: mae(&truth, &predicted),
        r2: r2(&truth, &predicted),
        mape: mape(&truth, &predicted),
        median_prediction_time: median_time(&log.prediction_times()?),
    })
}

pub fn mse(truth: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs().powi(2))
        .sum();
    sum / truth.len() as f64
}

pub fn mae(truth: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).abs()).sum();
    sum / truth.len() as f64
}

/// Coefficient of determination; constant targets floor the total sum of squares at epsilon
pub fn r2(truth: &[f64], predicted: &[f64]) -> f64 {
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    1.0 - ss_res / ss_tot.max(f64::EPSILON)
}

/// Mean absolute percentage error as a fraction; zero targets use an epsilon denominator
pub fn mape(truth: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs() / t.abs().max(f64::EPSILON))
        .sum();
    sum / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResultsConfig;

    const TRUTH: [f64; 10] = [3.0, -0.5, 2.0, 7.0, -2.0, -2.0, -2.0, 1.0, 10.0, 1e6];
    const PREDICTED: [f64; 10] = [2.5, 0.0, 2.0, 8.0, -2.0, -2.0, -2.0, 0.9, 15.0, 1.2e6];

    fn assert_rel(actual: f64, expected: f64) {
        assert!(
            ((actual - expected) / expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_scenario() {
        let mut log = PredictionLog::new(ResultsConfig::default());
        log.add_all_predictions(Some(&TRUTH), &PREDICTED, None, &[4; 10], None)
            .unwrap();
        log.finalize(None).unwrap();
        let stats = compute(&log).unwrap();

        assert_eq!(stats.num_instances, 10);
        assert_rel(stats.mse, 4_000_000_002.651);
        assert_rel(stats.mae, 20_000.71);
        assert_rel(stats.r2, 0.9555553925698493);
        assert_rel(stats.mape, 0.21095238095238095);
        assert_eq!(stats.median_prediction_time, 4);
    }

    #[test]
    fn test_constant_targets_do_not_divide_by_zero() {
        let value = r2(&[2.0, 2.0, 2.0], &[2.0, 2.0, 2.0]);
        assert_eq!(value, 1.0);
        assert!(r2(&[2.0, 2.0], &[1.0, 3.0]).is_finite());
    }

    #[test]
    fn test_zero_target_mape_is_finite() {
        assert!(mape(&[0.0, 1.0], &[0.5, 1.0]).is_finite());
        assert_eq!(mape(&[0.0], &[0.0]), 0.0);
    }
}
