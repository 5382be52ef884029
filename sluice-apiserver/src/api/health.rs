//! Health and Counters API Handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::api::state::AppState;
use crate::service::counters::CounterSnapshot;

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics
/// Upload request totals since process start
pub async fn upload_metrics(State(state): State<AppState>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}
