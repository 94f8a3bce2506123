//! Data management module
//!
//! Loads dated price observations, enforces chronological order and fills
//! missing values.

pub mod loader;
pub mod series;

pub use loader::*;
pub use series::*;
