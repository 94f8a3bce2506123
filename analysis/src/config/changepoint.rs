//! Change-point detector configuration

use crate::changepoint::{CostModel, Pelt, DEFAULT_JUMP, DEFAULT_MIN_SIZE, DEFAULT_PELT_PENALTY};
use serde::{Deserialize, Serialize};

/// PELT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeltConfig {
    /// Segment cost (`l1`, `l2`, `rbf`)
    pub model: CostModel,
    /// Penalty added per segment
    pub penalty: f64,
    /// Minimum segment length
    pub min_size: usize,
    /// Breakpoint grid spacing
    pub jump: usize,
}

impl Default for PeltConfig {
    fn default() -> Self {
        Self {
            model: CostModel::Rbf,
            penalty: DEFAULT_PELT_PENALTY,
            min_size: DEFAULT_MIN_SIZE,
            jump: DEFAULT_JUMP,
        }
    }
}

impl PeltConfig {
    pub fn detector(&self) -> Pelt {
        Pelt::new(self.model)
            .with_min_size(self.min_size)
            .with_jump(self.jump)
            .with_penalty(self.penalty)
    }
}

/// MCMC settings for the Bayesian change-point model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianConfig {
    /// Retained posterior draws
    pub n_samples: usize,
    /// Warm-up iterations discarded before sampling
    pub n_warmup: usize,
    /// Keep every `thin`-th draw
    pub thin: usize,
    /// RNG seed, `None` seeds from entropy
    pub seed: Option<u64>,
    /// Prior sd of the regime means, in units of the sample sd
    pub prior_scale: f64,
    /// Random-walk step on log sigma
    pub proposal_scale: f64,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            n_samples: 2000,
            n_warmup: 1000,
            thin: 1,
            seed: Some(42),
            prior_scale: 10.0,
            proposal_scale: 0.1,
        }
    }
}
