pub mod analysis;
pub mod files;
pub mod health;
pub mod settings;
pub mod workspace;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Workspace state
        .route("/workspace", get(workspace::get_workspace))
        .route("/workspace/events", get(workspace::workspace_events))
        .route("/modes", get(workspace::list_modes))
        .route("/mode", put(workspace::set_mode))
        // Files
        .route("/files", get(files::list_files))
        .route("/files", post(files::upload_file))
        .route("/files/:file_id", delete(files::delete_file))
        // Analysis
        .route("/analysis", post(analysis::run_analysis))
        .route("/analysis", get(analysis::get_analysis))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
}
