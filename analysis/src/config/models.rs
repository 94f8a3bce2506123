//! Forecasting model configuration

use serde::{Deserialize, Serialize};

/// ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// ARIMA fitting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaConfig {
    pub order: ArimaOrder,
    /// Nelder-Mead iteration cap
    pub max_iter: usize,
    /// Convergence tolerance on the simplex spread
    pub tolerance: f64,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            max_iter: 2000,
            tolerance: 1e-8,
        }
    }
}

/// VAR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarConfig {
    /// Fixed lag order, used when `select_order` is false
    pub lags: usize,
    /// Pick the lag order by information criterion
    pub select_order: bool,
    pub max_lags: usize,
    /// Forecast / impulse-response horizon
    pub steps: usize,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            lags: 1,
            select_order: false,
            max_lags: 15,
            steps: 10,
        }
    }
}

/// Markov-switching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovConfig {
    pub k_regimes: usize,
    /// EM iteration cap
    pub max_iter: usize,
    /// Stop when the log-likelihood gain falls below this
    pub tolerance: f64,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            k_regimes: 2,
            max_iter: 500,
            tolerance: 1e-8,
        }
    }
}

/// LSTM network and training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmConfig {
    /// Units per stacked LSTM layer
    pub hidden_sizes: Vec<usize>,
    pub dropout: f64,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Window length fed to the network
    pub lookback: usize,
    /// Fraction of windows held out for validation (0 disables)
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![50, 50],
            dropout: 0.2,
            learning_rate: 0.001,
            epochs: 20,
            batch_size: 32,
            lookback: 60,
            validation_split: 0.0,
            seed: 42,
        }
    }
}
