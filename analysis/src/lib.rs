//! Brent Analysis: change-point detection and time-series modeling for
//! Brent crude oil prices
//!
//! # Features
//!
//! - **Data**: dated price CSV loading, gap interpolation, resampling
//! - **Statistics**: descriptive statistics, rolling volatility, ADF test, correlation
//! - **Change points**: CUSUM heuristic, PELT (`l1`, `l2`, `rbf`), Bayesian MCMC
//! - **Models**: ARIMA, VAR, Markov switching, LSTM
//! - **Evaluation**: RMSE / MAE / MAPE / R², forecast charts
//! - **Macro data**: World Bank indicators merged with annual prices
//!
//! # Example
//!
//! ```no_run
//! use brent_analysis::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let prices = load_prices("data/BrentOilPrices.csv")?;
//!     let stats = BasicStatistics::compute(&prices.prices())?;
//!     println!("{}", stats.format());
//!
//!     let bkps = Pelt::new(CostModel::L2).predict(&prices.prices(), 10.0)?;
//!     println!("change points: {:?}", bkps.interior());
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod changepoint;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod macro_data;
pub mod models;
pub mod plot;
pub mod stats;

// Re-export commonly used types
pub mod prelude {
    pub use crate::artifacts::*;
    pub use crate::changepoint::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::evaluation::*;
    pub use crate::macro_data::*;
    pub use crate::models::*;
    pub use crate::plot::*;
    pub use crate::stats::*;

    pub use crate::error::{AnalysisError, Result};
}

pub use error::{AnalysisError, Result};
