//! Forecast accuracy metrics

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Accuracy of a forecast against observed values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// Mean absolute percentage error, `None` when an actual value is zero
    pub mape: Option<f64>,
    /// Coefficient of determination
    pub r2: f64,
    pub count: usize,
}

/// Compare `predicted` against `actual` position by position
pub fn evaluate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics> {
    if actual.len() != predicted.len() {
        return Err(AnalysisError::invalid(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(AnalysisError::insufficient("nothing to evaluate"));
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    let mape = if actual.iter().any(|&a| a == 0.0) {
        None
    } else {
        Some(
            actual
                .iter()
                .zip(&errors)
                .map(|(a, e)| (e / a).abs())
                .sum::<f64>()
                / n
                * 100.0,
        )
    };

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = errors.iter().map(|e| e * e).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        f64::NAN
    };

    info!("RMSE: {:.4}, MAE: {:.4}", rmse, mae);
    Ok(ForecastMetrics {
        rmse,
        mae,
        mape,
        r2,
        count: actual.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_computed_metrics() {
        let m = evaluate_forecast(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert!((m.rmse - 1.0).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.mape.unwrap() - 12.5).abs() < 1e-12);
        // ss_tot = 5, ss_res = 4
        assert!((m.r2 - 0.2).abs() < 1e-12);
        assert_eq!(m.count, 4);
    }

    #[test]
    fn test_perfect_forecast() {
        let m = evaluate_forecast(&[0.0, 5.0], &[0.0, 5.0]).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert!(m.mape.is_none());
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(evaluate_forecast(&[1.0], &[1.0, 2.0]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }
}
