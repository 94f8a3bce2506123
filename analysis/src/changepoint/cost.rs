//! Segment cost functions for penalized segmentation

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest signal the `rbf` cost accepts by default; its Gram integral
/// image needs `(n + 1)^2` floats.
pub const DEFAULT_MAX_RBF_SAMPLES: usize = 6000;

/// Cost model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostModel {
    /// Sum of absolute deviations from the segment median
    L1,
    /// Sum of squared deviations from the segment mean
    L2,
    /// Gaussian-kernel cost (detects changes in distribution)
    Rbf,
}

impl CostModel {
    /// Smallest segment the cost is defined on
    pub fn min_size(&self) -> usize {
        match self {
            CostModel::L1 => 2,
            CostModel::L2 | CostModel::Rbf => 1,
        }
    }
}

impl FromStr for CostModel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l1" => Ok(CostModel::L1),
            "l2" => Ok(CostModel::L2),
            "rbf" => Ok(CostModel::Rbf),
            other => Err(AnalysisError::invalid(format!(
                "unknown cost model {:?} (expected l1, l2 or rbf)",
                other
            ))),
        }
    }
}

impl fmt::Display for CostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CostModel::L1 => "l1",
            CostModel::L2 => "l2",
            CostModel::Rbf => "rbf",
        };
        f.write_str(name)
    }
}

/// Cost of treating `signal[start..end]` as one homogeneous segment
pub trait SegmentCost {
    fn error(&self, start: usize, end: usize) -> f64;
}

/// L2 cost from prefix sums, O(1) per segment
#[derive(Debug, Clone)]
pub struct CostL2 {
    cumsum: Vec<f64>,
    cumsum_sq: Vec<f64>,
}

impl CostL2 {
    pub fn new(signal: &[f64]) -> Self {
        let mut cumsum = Vec::with_capacity(signal.len() + 1);
        let mut cumsum_sq = Vec::with_capacity(signal.len() + 1);
        cumsum.push(0.0);
        cumsum_sq.push(0.0);
        for &x in signal {
            cumsum.push(cumsum[cumsum.len() - 1] + x);
            cumsum_sq.push(cumsum_sq[cumsum_sq.len() - 1] + x * x);
        }
        Self { cumsum, cumsum_sq }
    }
}

impl SegmentCost for CostL2 {
    fn error(&self, start: usize, end: usize) -> f64 {
        let n = (end - start) as f64;
        let sum = self.cumsum[end] - self.cumsum[start];
        let sum_sq = self.cumsum_sq[end] - self.cumsum_sq[start];
        (sum_sq - sum * sum / n).max(0.0)
    }
}

/// L1 cost, sorts the segment to find its median
#[derive(Debug, Clone)]
pub struct CostL1 {
    signal: Vec<f64>,
}

impl CostL1 {
    pub fn new(signal: &[f64]) -> Self {
        Self {
            signal: signal.to_vec(),
        }
    }
}

impl SegmentCost for CostL1 {
    fn error(&self, start: usize, end: usize) -> f64 {
        let segment = &self.signal[start..end];
        let mut sorted = segment.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        segment.iter().map(|x| (x - median).abs()).sum()
    }
}

/// RBF kernel cost.
///
/// `K(i, j) = exp(-clip(gamma * |x_i - x_j|^2, 1e-2, 1e2))` off the diagonal
/// and 1 on it; `gamma` defaults to the inverse median pairwise squared
/// distance. The segment cost is `len - sum(K[seg, seg]) / len`, read from a
/// 2-D prefix sum of the Gram matrix.
#[derive(Debug, Clone)]
pub struct CostRbf {
    n: usize,
    gamma: f64,
    integral: Vec<f64>,
}

impl CostRbf {
    pub fn new(signal: &[f64], gamma: Option<f64>, max_samples: usize) -> Result<Self> {
        let n = signal.len();
        if n > max_samples {
            return Err(AnalysisError::invalid(format!(
                "rbf cost supports at most {} samples, got {}; resample the series or use the l1/l2 cost",
                max_samples, n
            )));
        }

        let gamma = match gamma {
            Some(g) if g > 0.0 && g.is_finite() => g,
            Some(g) => {
                return Err(AnalysisError::invalid(format!(
                    "rbf gamma must be positive, got {}",
                    g
                )))
            }
            None => {
                let mut distances = Vec::with_capacity(n * n.saturating_sub(1) / 2);
                for i in 0..n {
                    for j in (i + 1)..n {
                        distances.push((signal[i] - signal[j]).powi(2));
                    }
                }
                match median_in_place(&mut distances) {
                    Some(m) if m != 0.0 => 1.0 / m,
                    _ => 1.0,
                }
            }
        };

        let stride = n + 1;
        let mut integral = vec![0.0; stride * stride];
        for i in 0..n {
            for j in 0..n {
                let k = if i == j {
                    1.0
                } else {
                    let scaled = (gamma * (signal[i] - signal[j]).powi(2)).clamp(1e-2, 1e2);
                    (-scaled).exp()
                };
                integral[(i + 1) * stride + (j + 1)] = k
                    + integral[i * stride + (j + 1)]
                    + integral[(i + 1) * stride + j]
                    - integral[i * stride + j];
            }
        }

        Ok(Self { n, gamma, integral })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    fn block_sum(&self, start: usize, end: usize) -> f64 {
        let stride = self.n + 1;
        self.integral[end * stride + end] - self.integral[start * stride + end]
            - self.integral[end * stride + start]
            + self.integral[start * stride + start]
    }
}

impl SegmentCost for CostRbf {
    fn error(&self, start: usize, end: usize) -> f64 {
        let len = (end - start) as f64;
        (len - self.block_sum(start, end) / len).max(0.0)
    }
}

fn median_in_place(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *upper;
    if values.len() % 2 == 1 {
        return Some(upper);
    }
    // largest value of the lower half
    let lower = values[..mid]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    Some((lower + upper) / 2.0)
}
