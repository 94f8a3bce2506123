//! HTTP dashboard API over the pre-computed price and indicator tables.

pub mod handlers;

use axum::{routing::get, Router};
use shared::{Config, CsvTable, ModelMetrics};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Tables loaded once at startup. A table that failed to load keeps its
/// error text so every request can report it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub trends: Arc<Result<CsvTable, String>>,
    pub events: Arc<Result<CsvTable, String>>,
    pub metrics: ModelMetrics,
}

impl AppState {
    pub fn new(
        trends: Result<CsvTable, String>,
        events: Result<CsvTable, String>,
        metrics: ModelMetrics,
    ) -> Self {
        Self {
            trends: Arc::new(trends),
            events: Arc::new(events),
            metrics,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let load = |path: &std::path::Path| {
            CsvTable::from_path(path)
                .map(|table| {
                    info!("Loaded {} rows from {}", table.len(), path.display());
                    table
                })
                .map_err(|e| {
                    error!("Failed to load {}: {}", path.display(), e);
                    e.to_string()
                })
        };

        let metrics = match &config.metrics_path {
            Some(path) => ModelMetrics::from_file(path).unwrap_or_else(|e| {
                warn!("Failed to read metrics from {}: {}, using defaults", path.display(), e);
                ModelMetrics::default()
            }),
            None => ModelMetrics::default(),
        };

        Self::new(load(config.prices_csv.as_path()), load(config.events_csv.as_path()), metrics)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/api/trends", get(handlers::trends))
        .route("/api/events", get(handlers::events))
        .route("/api/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
