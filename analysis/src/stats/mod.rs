//! Descriptive statistics module
//!
//! Summary statistics, rolling-window indicators built on the `ta` crate,
//! stationarity testing and correlation.

pub mod correlation;
pub mod descriptive;
pub mod regression;
pub mod rolling;
pub mod stationarity;

pub use correlation::*;
pub use descriptive::*;
pub use regression::*;
pub use rolling::*;
pub use stationarity::*;

/// Streaming indicator over a price series
pub trait Indicator {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, value: f64);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}

/// Run an indicator over a whole series, one output per input.
pub fn run_indicator<I: Indicator>(indicator: &mut I, values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| {
            indicator.update(v);
            indicator.value()
        })
        .collect()
}
