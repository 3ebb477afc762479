//! Workspace state endpoints: snapshot, change stream and mode switching.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{stream, Stream};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::domain::{AnalysisMode, ModeView};

/// GET /workspace
pub async fn get_workspace(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    DataResponse::new(state.workspace.snapshot())
}

/// GET /workspace/events
///
/// Server-sent events: the current snapshot first, then one event per change.
/// Changes that land between two reads are coalesced into the latest snapshot.
pub async fn workspace_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.workspace.subscribe();

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("workspace")
            .id(snapshot.revision.to_string())
            .json_data(&snapshot);
        Some((event, (rx, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /modes
pub async fn list_modes() -> impl IntoResponse {
    let modes: Vec<ModeView> = AnalysisMode::ALL.into_iter().map(ModeView::from).collect();
    DataResponse::new(modes)
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: AnalysisMode,
}

/// PUT /mode
pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetModeRequest>,
) -> impl IntoResponse {
    state.workspace.set_mode(req.mode);
    DataResponse::new(ModeView::from(req.mode))
}
