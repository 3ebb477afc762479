use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::services::ai_client::BackendError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub ai_service: String,
}

/// Health check endpoint
///
/// The AI service is never critical: without it analyses fall back, so the
/// service reports `degraded` rather than failing.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let ai_status = match state.ai_client.health_check().await {
        Ok(()) => "ok",
        Err(BackendError::MissingApiKey) => "unconfigured",
        Err(e) => {
            tracing::debug!(error = %e, "AI service health check failed");
            "error"
        }
    };

    let status = if ai_status == "ok" { "healthy" } else { "degraded" };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                ai_service: ai_status.to_string(),
            },
        }),
    )
}
