//! Scaling and windowing for sequence models

use crate::error::{AnalysisError, Result};
use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

/// Rescales values linearly onto `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(AnalysisError::insufficient("no values to fit the scaler"));
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            range
        } else {
            1.0
        }
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.min) / self.range()).collect()
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| v * self.range() + self.min).collect()
    }
}

/// Sliding windows of `lookback` values, each labelled with the value that
/// follows it. Returns inputs shaped `(windows, lookback, 1)` and targets.
pub fn make_windows(series: &[f64], lookback: usize) -> Result<(Array3<f64>, Array1<f64>)> {
    if lookback == 0 {
        return Err(AnalysisError::invalid("lookback must be at least 1"));
    }
    if series.len() <= lookback {
        return Err(AnalysisError::insufficient(format!(
            "{} values cannot form a window of {} plus a target",
            series.len(),
            lookback
        )));
    }
    let count = series.len() - lookback;
    let x = Array3::from_shape_fn((count, lookback, 1), |(n, t, _)| series[n + t]);
    let y = Array1::from_shape_fn(count, |n| series[n + lookback]);
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_round_trip() {
        let values = [10.0, 20.0, 15.0];
        let scaler = MinMaxScaler::fit(&values).unwrap();
        assert_eq!(scaler.transform(&values), vec![0.0, 1.0, 0.5]);
        assert_eq!(scaler.inverse_transform(&[0.5]), vec![15.0]);

        let flat = MinMaxScaler::fit(&[3.0, 3.0]).unwrap();
        assert_eq!(flat.transform(&[3.0]), vec![0.0]);
    }

    #[test]
    fn test_make_windows() {
        let (x, y) = make_windows(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(x.dim(), (2, 3, 1));
        assert_eq!(x[[1, 0, 0]], 2.0);
        assert_eq!(x[[1, 2, 0]], 4.0);
        assert_eq!(y.to_vec(), vec![4.0, 5.0]);
        assert!(make_windows(&[1.0, 2.0], 2).is_err());
    }
}
