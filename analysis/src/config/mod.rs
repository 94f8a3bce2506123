//! Configuration module

pub mod changepoint;
pub mod models;

pub use changepoint::*;
pub use models::*;
