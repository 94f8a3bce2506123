//! Year-keyed indicator table

use crate::error::{AnalysisError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub const YEAR_COLUMN: &str = "year";
pub const PRICE_COLUMN: &str = "Price";

/// Named indicator columns indexed by year; cells may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    columns: Vec<String>,
    rows: BTreeMap<i32, Vec<Option<f64>>>,
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a column; years not seen before get a row with the other cells missing
    pub fn insert_column(&mut self, name: &str, values: &[(i32, Option<f64>)]) -> Result<()> {
        if name == YEAR_COLUMN || self.columns.iter().any(|c| c == name) {
            return Err(AnalysisError::invalid(format!("duplicate column {:?}", name)));
        }
        let width = self.columns.len();
        self.columns.push(name.to_string());
        for row in self.rows.values_mut() {
            row.push(None);
        }
        for &(year, value) in values {
            let row = self.rows.entry(year).or_insert_with(|| vec![None; width + 1]);
            row[width] = value;
        }
        Ok(())
    }

    pub fn get(&self, year: i32, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&year).and_then(|row| row[idx])
    }

    pub fn column(&self, name: &str) -> Option<Vec<(i32, Option<f64>)>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|(&y, row)| (y, row[idx])).collect())
    }

    /// Inner join with annual prices on year, adding a `Price` column
    pub fn merge_prices(&self, annual: &[(i32, f64)]) -> Result<Self> {
        let prices: BTreeMap<i32, f64> = annual.iter().copied().collect();
        let mut merged = Self {
            columns: self.columns.clone(),
            rows: BTreeMap::new(),
        };
        merged.columns.push(PRICE_COLUMN.to_string());
        for (year, row) in &self.rows {
            if let Some(&price) = prices.get(year) {
                let mut row = row.clone();
                row.push(Some(price));
                merged.rows.insert(*year, row);
            }
        }
        if merged.is_empty() {
            return Err(AnalysisError::insufficient(
                "indicator and price years do not overlap",
            ));
        }
        info!("Merged indicators with prices: {} common years", merged.len());
        Ok(merged)
    }

    /// Columns restricted to the years where every column has a value
    pub fn complete_columns(&self) -> Vec<(String, Vec<f64>)> {
        let complete: Vec<&Vec<Option<f64>>> = self
            .rows
            .values()
            .filter(|row| row.iter().all(Option::is_some))
            .collect();
        if complete.len() < self.rows.len() {
            warn!(
                "Dropping {} years with missing indicator values",
                self.rows.len() - complete.len()
            );
        }
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<f64> = complete.iter().filter_map(|row| row[i]).collect();
                (name.clone(), values)
            })
            .collect()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![YEAR_COLUMN.to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;
        for (year, row) in &self.rows {
            let mut record = vec![year.to_string()];
            record.extend(row.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        info!("Indicator table written to {}", path.display());
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let year_idx = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(YEAR_COLUMN))
            .ok_or_else(|| AnalysisError::Parse(format!("{} has no year column", path.display())))?;

        let mut table = Self {
            columns: headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != year_idx)
                .map(|(_, h)| h.trim().to_string())
                .collect(),
            rows: BTreeMap::new(),
        };
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let year_cell = record.get(year_idx).unwrap_or("").trim();
            let year: i32 = year_cell.parse().map_err(|_| {
                AnalysisError::Parse(format!("line {}: invalid year {:?}", line + 2, year_cell))
            })?;
            let row = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != year_idx)
                .map(|(_, cell)| cell.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect();
            table.rows.insert(year, row);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndicatorTable {
        let mut table = IndicatorTable::new();
        table
            .insert_column("GDP", &[(1990, Some(1.0)), (1991, Some(2.0)), (1992, None)])
            .unwrap();
        table
            .insert_column("Inflation", &[(1991, Some(3.5)), (1993, Some(4.0))])
            .unwrap();
        table
    }

    #[test]
    fn test_insert_columns_aligns_years() {
        let table = sample();
        assert_eq!(table.years(), vec![1990, 1991, 1992, 1993]);
        assert_eq!(table.get(1991, "Inflation"), Some(3.5));
        assert_eq!(table.get(1990, "Inflation"), None);
        assert_eq!(table.get(1993, "GDP"), None);
        assert!(table.clone().insert_column("GDP", &[]).is_err());
    }

    #[test]
    fn test_merge_prices_is_inner_join() {
        let merged = sample().merge_prices(&[(1991, 20.0), (1993, 18.5), (2000, 30.0)]).unwrap();
        assert_eq!(merged.years(), vec![1991, 1993]);
        assert_eq!(merged.columns().last().map(String::as_str), Some("Price"));
        assert_eq!(merged.get(1993, "Price"), Some(18.5));

        let complete = merged.complete_columns();
        assert_eq!(complete[0], ("GDP".to_string(), vec![2.0]));
        assert!(sample().merge_prices(&[(1800, 1.0)]).is_err());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indicators.csv");
        let table = sample();
        table.write_csv(&path).unwrap();
        let loaded = IndicatorTable::read_csv(&path).unwrap();
        assert_eq!(loaded, table);
    }
}
