//! PELT penalized segmentation

use crate::changepoint::cost::{
    CostL1, CostL2, CostModel, CostRbf, SegmentCost, DEFAULT_MAX_RBF_SAMPLES,
};
use crate::changepoint::{ChangePointDetector, ChangePoints};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_PELT_PENALTY: f64 = 10.0;
pub const DEFAULT_MIN_SIZE: usize = 2;
pub const DEFAULT_JUMP: usize = 5;

/// Pruned Exact Linear Time segmentation.
///
/// Candidate breakpoints lie on the `jump` grid (plus the signal end); a start
/// point stays admissible while its partial cost is within one penalty of the
/// current optimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pelt {
    model: CostModel,
    min_size: usize,
    jump: usize,
    penalty: f64,
    gamma: Option<f64>,
    max_rbf_samples: usize,
}

impl Default for Pelt {
    fn default() -> Self {
        Self::new(CostModel::Rbf)
    }
}

impl Pelt {
    pub fn new(model: CostModel) -> Self {
        Self {
            model,
            min_size: DEFAULT_MIN_SIZE,
            jump: DEFAULT_JUMP,
            penalty: DEFAULT_PELT_PENALTY,
            gamma: None,
            max_rbf_samples: DEFAULT_MAX_RBF_SAMPLES,
        }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_jump(mut self, jump: usize) -> Self {
        self.jump = jump;
        self
    }

    /// Penalty used by [`ChangePointDetector::detect`]
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Fixed RBF bandwidth instead of the median heuristic
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn with_max_rbf_samples(mut self, max: usize) -> Self {
        self.max_rbf_samples = max;
        self
    }

    pub fn model(&self) -> CostModel {
        self.model
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Effective minimum segment length for the configured cost
    pub fn min_size(&self) -> usize {
        self.min_size.max(self.model.min_size())
    }

    pub fn jump(&self) -> usize {
        self.jump
    }

    /// Segment `signal` with the given penalty
    pub fn predict(&self, signal: &[f64], penalty: f64) -> Result<ChangePoints> {
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "penalty must be a non-negative number, got {}",
                penalty
            )));
        }
        if self.jump == 0 {
            return Err(AnalysisError::invalid("jump must be at least 1"));
        }
        let min_size = self.min_size();
        if signal.len() < min_size {
            return Err(AnalysisError::insufficient(format!(
                "signal of length {} is shorter than the minimum segment size {}",
                signal.len(),
                min_size
            )));
        }

        let bkps = match self.model {
            CostModel::L1 => self.segment(&CostL1::new(signal), signal.len(), penalty)?,
            CostModel::L2 => self.segment(&CostL2::new(signal), signal.len(), penalty)?,
            CostModel::Rbf => {
                let cost = CostRbf::new(signal, self.gamma, self.max_rbf_samples)?;
                debug!("rbf bandwidth gamma = {:.6}", cost.gamma());
                self.segment(&cost, signal.len(), penalty)?
            }
        };

        info!(
            "PELT ({} cost, penalty {}) found {} change points: {:?}",
            self.model,
            penalty,
            bkps.len(),
            bkps.interior()
        );
        Ok(bkps)
    }

    fn segment<C: SegmentCost>(&self, cost: &C, n: usize, penalty: f64) -> Result<ChangePoints> {
        let min_size = self.min_size();
        let jump = self.jump;

        // total[t]: optimal penalized cost of signal[..t]; prev[t]: its last start
        let mut total: Vec<Option<f64>> = vec![None; n + 1];
        let mut prev: Vec<usize> = vec![0; n + 1];
        total[0] = Some(0.0);

        let mut candidates: Vec<usize> = (0..n).step_by(jump).filter(|&k| k >= min_size).collect();
        candidates.push(n);

        let mut admissible: Vec<usize> = Vec::new();
        for &bkp in &candidates {
            let new_start = (bkp - min_size) / jump * jump;
            if admissible.last() != Some(&new_start) {
                admissible.push(new_start);
            }

            let mut evaluated: Vec<(usize, f64)> = Vec::with_capacity(admissible.len());
            let mut best: Option<(usize, f64)> = None;
            for &t in &admissible {
                let Some(base) = total[t] else { continue };
                if bkp - t < min_size {
                    continue;
                }
                let sub_total = base + cost.error(t, bkp) + penalty;
                evaluated.push((t, sub_total));
                if best.map_or(true, |(_, b)| sub_total < b) {
                    best = Some((t, sub_total));
                }
            }

            let Some((best_start, best_total)) = best else {
                continue;
            };
            total[bkp] = Some(best_total);
            prev[bkp] = best_start;

            admissible = evaluated
                .into_iter()
                .filter(|&(_, sub_total)| sub_total <= best_total + penalty)
                .map(|(t, _)| t)
                .collect();
        }

        if total[n].is_none() {
            return Err(AnalysisError::numerical(
                "PELT found no admissible segmentation of the signal",
            ));
        }

        let mut bkps = vec![n];
        let mut end = n;
        while prev[end] > 0 {
            end = prev[end];
            bkps.push(end);
        }
        bkps.reverse();
        ChangePoints::new(bkps, n)
    }
}

impl ChangePointDetector for Pelt {
    fn name(&self) -> &str {
        "PELT"
    }

    fn detect(&self, signal: &[f64]) -> Result<ChangePoints> {
        self.predict(signal, self.penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_signal() -> Vec<f64> {
        let mut signal = vec![0.0; 50];
        signal.extend(vec![10.0; 50]);
        signal
    }

    #[test]
    fn test_l2_finds_step() {
        let bkps = Pelt::new(CostModel::L2).predict(&step_signal(), 10.0).unwrap();
        assert_eq!(bkps.breakpoints(), &[50, 100]);
    }

    #[test]
    fn test_rbf_finds_step() {
        let bkps = Pelt::default().detect(&step_signal()).unwrap();
        assert_eq!(bkps.breakpoints(), &[50, 100]);
    }

    #[test]
    fn test_l1_finds_two_steps() {
        let mut signal = vec![1.0; 30];
        signal.extend(vec![8.0; 30]);
        signal.extend(vec![-4.0; 40]);
        let bkps = Pelt::new(CostModel::L1).predict(&signal, 5.0).unwrap();
        assert_eq!(bkps.breakpoints(), &[30, 60, 100]);
    }

    #[test]
    fn test_huge_penalty_gives_single_segment() {
        let bkps = Pelt::new(CostModel::L2).predict(&step_signal(), 1e9).unwrap();
        assert_eq!(bkps.breakpoints(), &[100]);
    }

    #[test]
    fn test_breakpoints_respect_grid_and_min_size() {
        let signal: Vec<f64> = (0..97)
            .map(|i| ((i as f64) * 0.7).sin() * 3.0 + if i > 40 { 5.0 } else { 0.0 })
            .collect();
        let pelt = Pelt::new(CostModel::L2).with_min_size(3).with_jump(4);
        let bkps = pelt.predict(&signal, 1.0).unwrap();

        assert_eq!(*bkps.breakpoints().last().unwrap(), 97);
        for &b in bkps.interior() {
            assert_eq!(b % 4, 0);
        }
        for seg in bkps.segments() {
            assert!(seg.len() >= 3, "segment {:?} too short", seg);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let pelt = Pelt::new(CostModel::L2);
        assert!(pelt.predict(&step_signal(), -1.0).is_err());
        assert!(pelt.predict(&[1.0], 10.0).is_err());
        assert!(Pelt::new(CostModel::Rbf)
            .with_max_rbf_samples(50)
            .predict(&step_signal(), 10.0)
            .is_err());
    }
}
