use serde::{Deserialize, Serialize};
use std::path::Path;

/// JSON envelope returned by every API endpoint except `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success { data: T },
    Error { message: String },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data }
    }

    pub fn error(message: impl ToString) -> Self {
        ApiResponse::Error {
            message: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ApiResponse::success(data),
            Err(e) => ApiResponse::error(e),
        }
    }
}

/// Forecast accuracy served by `/api/metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub mae: f64,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self {
            rmse: 2.34,
            mae: 1.16,
        }
    }
}

impl ModelMetrics {
    pub fn new(rmse: f64, mae: f64) -> Self {
        Self { rmse, mae }
    }

    /// Read metrics written by `brent evaluate --save-metrics`.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let text = std::fs::read_to_string(path)?;
        let metrics = serde_json::from_str(&text)?;
        Ok(metrics)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), anyhow::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
