//! User settings routes
//!
//! Theme and display profile endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::domain::UpdateSettingsRequest;
use crate::error::{ApiError, ApiResult};

/// GET /settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    DataResponse::new(state.preferences.snapshot())
}

/// PUT /settings
///
/// Only the theme is persisted; name and avatar last until restart.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<UpdateSettingsRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(name) = req.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Display name cannot be empty".to_string()));
        }
    }

    let settings = state.preferences.apply(req).await?;
    tracing::debug!(theme = settings.theme.as_str(), "Settings updated");

    Ok(DataResponse::new(settings))
}
