//! Untyped CSV tables served as JSON records.

use serde_json::{Map, Number, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A CSV file loaded as-is: header names plus one JSON value per cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl CsvTable {
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Value> = record.iter().map(parse_cell).collect();
            row.resize(columns.len(), Value::Null);
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as `{column: value}` objects, the shape the dashboard expects.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }
}

/// Numbers become JSON numbers, blanks and NaN become null.
fn parse_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Number::from_f64(float)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_with_mixed_cells() {
        let csv = "Date,Price,Note\n20-May-87,18.63,\n21-May-87,NaN,spike\n22-May-87,18\n";
        let table = CsvTable::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["Date", "Price", "Note"]);
        assert_eq!(table.len(), 3);

        let records = table.to_records();
        assert_eq!(records[0]["Date"], json!("20-May-87"));
        assert_eq!(records[0]["Price"], json!(18.63));
        assert_eq!(records[0]["Note"], Value::Null);
        assert_eq!(records[1]["Price"], Value::Null);
        assert_eq!(records[1]["Note"], json!("spike"));
        assert_eq!(records[2]["Price"], json!(18));
        assert_eq!(records[2]["Note"], Value::Null);
    }

    #[test]
    fn test_missing_file() {
        let err = CsvTable::from_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
