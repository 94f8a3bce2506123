//! Forecasting and regime models

pub mod arima;
pub mod lstm;
pub mod markov;
pub mod optimize;
pub mod var;

pub use arima::{difference, ArimaModel};
pub use lstm::{make_windows, LstmModel, MinMaxScaler, TrainingHistory};
pub use markov::{MarkovSwitching, MarkovSwitchingModel};
pub use var::{InfoCriterion, LagScore, VarModel};
