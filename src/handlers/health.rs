use std::sync::Arc;
use axum::{extract::State, Json};
use tracing::debug;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let store = if state.config.file_service_url.is_some() { "file service" } else { "in-memory store" };
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Service is ready ({})", store),
    })
}
