//! Cumulative-sum deviation heuristic

use crate::changepoint::{ChangePointDetector, ChangePoints};
use crate::error::{AnalysisError, Result};
use crate::stats::mean;
use tracing::info;

/// Index where the running sum of `(value - mean)` deviates furthest from
/// zero. The first maximum wins on ties.
///
/// A naive single change-point estimate with no statistical guarantee: the
/// returned index is the last observation of the first regime.
pub fn cusum_change_point(values: &[f64], mean: f64) -> Result<usize> {
    if values.is_empty() {
        return Err(AnalysisError::insufficient("no values for CUSUM"));
    }

    let mut running = 0.0;
    let mut best = (0usize, f64::NEG_INFINITY);
    for (i, v) in values.iter().enumerate() {
        running += v - mean;
        if running.abs() > best.1 {
            best = (i, running.abs());
        }
    }

    info!(
        "Simplified change point detection completed. Change point detected at index {}",
        best.0
    );
    Ok(best.0)
}

/// CUSUM as a detector: the new regime starts right after the peak index
#[derive(Debug, Default, Clone, Copy)]
pub struct CusumDetector;

impl ChangePointDetector for CusumDetector {
    fn name(&self) -> &str {
        "CUSUM"
    }

    fn detect(&self, signal: &[f64]) -> Result<ChangePoints> {
        let m = mean(signal).ok_or_else(|| AnalysisError::insufficient("no values for CUSUM"))?;
        let peak = cusum_change_point(signal, m)?;
        if peak + 1 >= signal.len() {
            return Ok(ChangePoints::none(signal.len()));
        }
        ChangePoints::new(vec![peak + 1, signal.len()], signal.len())
    }
}
