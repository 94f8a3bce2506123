//! Summary statistics

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Mean, median and spread of a price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator); NaN for one value
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl BasicStatistics {
    pub fn compute(values: &[f64]) -> Result<Self> {
        info!("Calculating basic statistics.");
        let mean = mean(values).ok_or_else(|| AnalysisError::insufficient("no values"))?;
        let median = median(values).unwrap_or(mean);
        let std_dev = std_dev(values).unwrap_or(f64::NAN);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        info!("Mean price: {}", mean);
        info!("Median price: {}", median);
        info!("Standard deviation of price: {}", std_dev);

        Ok(Self {
            count: values.len(),
            mean,
            median,
            std_dev,
            min,
            max,
        })
    }

    pub fn format(&self) -> String {
        format!(
            "count: {}\nmean: {:.4}\nmedian: {:.4}\nstd: {:.4}\nmin: {:.4}\nmax: {:.4}",
            self.count, self.mean, self.median, self.std_dev, self.min, self.max
        )
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample variance, `None` below two values
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_statistics() {
        let stats = BasicStatistics::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.median, 4.5);
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_edge_cases() {
        assert!(BasicStatistics::compute(&[]).is_err());
        let single = BasicStatistics::compute(&[3.0]).unwrap();
        assert_eq!(single.median, 3.0);
        assert!(single.std_dev.is_nan());
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }
}
