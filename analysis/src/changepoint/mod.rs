//! Change-point detection
//!
//! Three detectors share the [`ChangePointDetector`] seam:
//! - a cumulative-sum deviation heuristic (single change point),
//! - PELT penalized segmentation with `l1`, `l2` and `rbf` costs,
//! - a Bayesian single change-point model sampled by MCMC.

pub mod bayesian;
pub mod cost;
pub mod cusum;
pub mod pelt;

pub use bayesian::*;
pub use cost::*;
pub use cusum::*;
pub use pelt::*;

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ordered breakpoints into a signal, terminated by the signal length.
///
/// Each breakpoint is the first index of a new segment; the last element is
/// always the signal length, so a signal with no change is `[n]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePoints {
    breakpoints: Vec<usize>,
}

impl ChangePoints {
    pub fn new(breakpoints: Vec<usize>, signal_len: usize) -> Result<Self> {
        if breakpoints.last() != Some(&signal_len) {
            return Err(AnalysisError::invalid(format!(
                "breakpoints {:?} must end with the signal length {}",
                breakpoints, signal_len
            )));
        }
        if breakpoints[0] == 0 || breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::invalid(format!(
                "breakpoints {:?} must be strictly increasing and positive",
                breakpoints
            )));
        }
        Ok(Self { breakpoints })
    }

    /// No change: a single segment covering the whole signal
    pub fn none(signal_len: usize) -> Self {
        Self {
            breakpoints: vec![signal_len],
        }
    }

    /// All breakpoints including the terminal signal length
    pub fn breakpoints(&self) -> &[usize] {
        &self.breakpoints
    }

    /// Breakpoints strictly inside the signal
    pub fn interior(&self) -> &[usize] {
        &self.breakpoints[..self.breakpoints.len() - 1]
    }

    /// Number of detected changes
    pub fn len(&self) -> usize {
        self.breakpoints.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn signal_len(&self) -> usize {
        self.breakpoints[self.breakpoints.len() - 1]
    }

    /// Index ranges of the segments
    pub fn segments(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.breakpoints
            .iter()
            .map(|&end| {
                let range = start..end;
                start = end;
                range
            })
            .collect()
    }
}

/// Common interface of the detectors
pub trait ChangePointDetector {
    /// Get detector name
    fn name(&self) -> &str;

    /// Locate change points in `signal`
    fn detect(&self, signal: &[f64]) -> Result<ChangePoints>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_points_invariants() {
        let cps = ChangePoints::new(vec![30, 70, 100], 100).unwrap();
        assert_eq!(cps.interior(), &[30, 70]);
        assert_eq!(cps.len(), 2);
        assert_eq!(cps.segments(), vec![0..30, 30..70, 70..100]);

        assert!(ChangePoints::new(vec![30, 70], 100).is_err());
        assert!(ChangePoints::new(vec![70, 30, 100], 100).is_err());
        assert!(ChangePoints::new(vec![0, 100], 100).is_err());
        assert!(ChangePoints::none(10).is_empty());
    }
}
