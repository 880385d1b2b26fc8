//! Evaluation metrics: pure functions over actual and predicted stock levels.
//!
//! All functions take equal-length slices and return 0.0 for empty input.

use serde::{Deserialize, Serialize};

/// Holdout metrics of one trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// Percent, with a +1 smoothed denominator.
    pub mape: f64,
    pub r2: f64,
}

impl EvaluationMetrics {
    /// Compute all metrics for `predicted` against `actual`.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(actual.len(), predicted.len());
        Self {
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            mape: mape(actual, predicted),
            r2: r2_score(actual, predicted),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2))).sqrt()
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()))
}

/// Mean absolute percentage error, `mean(|a - p| / (a + 1)) * 100`.
///
/// The +1 keeps zero-stock days defined; it understates the error on small
/// actual values.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(actual.iter().zip(predicted).map(|(a, p)| (a - p).abs() / (a + 1.0))) * 100.0
}

/// Coefficient of determination.
///
/// With a constant `actual` the score is 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let m = mean(actual.iter().copied());
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - m).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn mape_smooths_zero_actuals() {
        let m = mape(&[0.0, 10.0], &[5.0, 8.0]);
        assert_approx(m, 259.090909, 1e-5);
    }

    #[test]
    fn perfect_fit() {
        let y = [3.0, 7.0, 11.0];
        let m = EvaluationMetrics::compute(&y, &y);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.mape, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn losses() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [2.0, 2.0, 2.0, 6.0];
        assert_approx(mae(&actual, &predicted), 1.0, 1e-12);
        assert_approx(rmse(&actual, &predicted), (6.0f64 / 4.0).sqrt(), 1e-12);
    }

    #[test]
    fn r2_against_mean_predictor_is_zero() {
        let actual = [2.0, 4.0, 6.0];
        assert_approx(r2_score(&actual, &[4.0, 4.0, 4.0]), 0.0, 1e-12);
        assert!(r2_score(&actual, &[6.0, 4.0, 2.0]) < 0.0);
    }

    #[test]
    fn r2_constant_actuals() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 6.0]), 0.0);
    }

    #[test]
    fn empty_input_is_zero() {
        let m = EvaluationMetrics::compute(&[], &[]);
        assert_eq!(m, EvaluationMetrics { rmse: 0.0, mae: 0.0, mape: 0.0, r2: 0.0 });
    }
}
