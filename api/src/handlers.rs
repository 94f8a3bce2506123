use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Map, Value};
use shared::{ApiResponse, CsvTable, ModelMetrics};
use tracing::error;

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Brent Oil Price Dashboard API!" }))
}

pub async fn trends(State(state): State<AppState>) -> Json<ApiResponse<Vec<Map<String, Value>>>> {
    Json(records(&state.trends, "trends"))
}

pub async fn events(State(state): State<AppState>) -> Json<ApiResponse<Vec<Map<String, Value>>>> {
    Json(records(&state.events, "events"))
}

pub async fn metrics(State(state): State<AppState>) -> Json<ApiResponse<ModelMetrics>> {
    Json(ApiResponse::success(state.metrics))
}

fn records(table: &Result<CsvTable, String>, name: &str) -> ApiResponse<Vec<Map<String, Value>>> {
    match table {
        Ok(table) => ApiResponse::success(table.to_records()),
        Err(e) => {
            error!("Serving {} failed: {}", name, e);
            ApiResponse::error(e)
        }
    }
}
