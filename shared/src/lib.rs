pub mod config;
pub mod logging;
pub mod models;
pub mod table;

pub use config::Config;
pub use logging::init_tracing;
pub use models::*;
pub use table::{CsvTable, TableError};
