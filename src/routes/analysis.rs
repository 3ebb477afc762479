//! Analysis endpoints.

use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::domain::AnalysisResult;
use crate::error::ApiResult;
use crate::middleware::RequestIdExt;
use crate::services::workspace::{AnalysisOutcome, SkipReason};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRunResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub result: Option<AnalysisResult>,
}

/// POST /analysis
///
/// Runs an analysis over the whole file set in the current mode and waits for
/// it. Failed analyses still answer 200 with the fallback result.
pub async fn run_analysis(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(
        request_id = headers.request_id().unwrap_or("-"),
        mode = %state.workspace.mode(),
        phase = ?state.workspace.phase(),
        "Analysis requested"
    );

    let response = match state.workspace.run_analysis().await? {
        AnalysisOutcome::Completed(result) => AnalysisRunResponse {
            started: true,
            skipped: None,
            result: Some(result),
        },
        AnalysisOutcome::Skipped(reason) => AnalysisRunResponse {
            started: false,
            skipped: Some(reason),
            result: None,
        },
    };

    Ok(DataResponse::new(response))
}

/// GET /analysis
pub async fn get_analysis(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    DataResponse::new(state.workspace.current_result())
}
