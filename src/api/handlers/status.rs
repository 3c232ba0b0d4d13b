use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::telemetry::render_status_page;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /`: HTML page with host statistics
pub async fn status_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let telemetry = Arc::clone(&state.telemetry);
    let stats = tokio::task::spawn_blocking(move || telemetry.collect())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Telemetry task panicked");
            ApiError::internal("Could not get system stats")
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to collect system stats");
            ApiError::internal("Could not get system stats")
        })?;

    Ok(Html(render_status_page(&stats)))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
