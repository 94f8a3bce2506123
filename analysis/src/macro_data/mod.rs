//! Macroeconomic indicators from the World Bank, joined with prices by year

pub mod table;
pub mod worldbank;

pub use table::IndicatorTable;
pub use worldbank::*;
