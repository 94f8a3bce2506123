//! Rolling-window indicators (volatility, moving average)

use crate::error::{AnalysisError, Result};
use crate::stats::{run_indicator, Indicator};
use ta::indicators::{SimpleMovingAverage, StandardDeviation};
use ta::Next;

/// Default volatility window in observations (trading days)
pub const DEFAULT_VOLATILITY_WINDOW: usize = 30;

/// Rolling sample standard deviation.
///
/// `ta` reports the population deviation of the window; the output is
/// rescaled by `sqrt(n / (n - 1))` to match the sample deviation.
#[derive(Debug)]
pub struct RollingStd {
    inner: StandardDeviation,
    window: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl RollingStd {
    /// Create new rolling deviation over `window` observations (at least 2)
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(AnalysisError::invalid(format!(
                "rolling std window must be at least 2, got {}",
                window
            )));
        }
        let inner = StandardDeviation::new(window)
            .map_err(|e| AnalysisError::invalid(format!("{:?}", e)))?;
        Ok(Self {
            inner,
            window,
            update_count: 0,
            last_value: None,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for RollingStd {
    fn name(&self) -> &str {
        "RollingStd"
    }

    fn update(&mut self, value: f64) {
        let population = self.inner.next(value);
        self.update_count += 1;
        if self.update_count >= self.window {
            let n = self.window as f64;
            self.last_value = Some(population * (n / (n - 1.0)).sqrt());
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.window
    }
}

/// Rolling mean
#[derive(Debug)]
pub struct RollingMean {
    inner: SimpleMovingAverage,
    window: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl RollingMean {
    pub fn new(window: usize) -> Result<Self> {
        let inner = SimpleMovingAverage::new(window)
            .map_err(|e| AnalysisError::invalid(format!("{:?}", e)))?;
        Ok(Self {
            inner,
            window,
            update_count: 0,
            last_value: None,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for RollingMean {
    fn name(&self) -> &str {
        "RollingMean"
    }

    fn update(&mut self, value: f64) {
        let sma_value = self.inner.next(value);
        self.update_count += 1;
        if self.update_count >= self.window {
            self.last_value = Some(sma_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.window
    }
}

/// Rolling sample standard deviation; `None` until the window is full
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut indicator = RollingStd::new(window)?;
    Ok(run_indicator(&mut indicator, values))
}

/// Rolling mean; `None` until the window is full
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut indicator = RollingMean::new(window)?;
    Ok(run_indicator(&mut indicator, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_std_matches_sample_std() {
        let out = rolling_std(&[1.0, 2.0, 3.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 1.0).abs() < 1e-9);
        assert!((out[3].unwrap() - 1.0).abs() < 1e-9);
        // sample std of [3, 4, 6]
        let expected = (7.0f64 / 3.0).sqrt();
        assert!((out[4].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_std_rejects_tiny_window() {
        assert!(RollingStd::new(1).is_err());
        assert!(RollingStd::new(0).is_err());
    }

    #[test]
    fn test_rolling_mean() {
        let mut mean = RollingMean::new(2).unwrap();
        assert_eq!(mean.name(), "RollingMean");
        assert!(!mean.is_ready());
        mean.update(1.0);
        assert_eq!(mean.value(), None);
        mean.update(3.0);
        assert!(mean.is_ready());
        assert_eq!(mean.value(), Some(2.0));
    }
}
