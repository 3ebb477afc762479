use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::{ingest, DeclaredType, IntakeError, ProjectFileResponse};
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file: ProjectFileResponse,
    /// Id of the file of the same type that this upload replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<Uuid>,
}

fn unreadable(e: MultipartError) -> IntakeError {
    IntakeError::Unreadable(e.body_text())
}

/// GET /files
pub async fn list_files(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let files: Vec<ProjectFileResponse> = state
        .workspace
        .files()
        .iter()
        .map(ProjectFileResponse::from)
        .collect();
    DataResponse::new(files)
}

/// POST /files
///
/// Multipart upload with a `type` field (declared type key or label) and a
/// `file` part. Any read failure rejects the upload; nothing is recorded.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Created<UploadResponse>> {
    let mut declared_type: Option<DeclaredType> = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("type") => {
                let text = field.text().await.map_err(unreadable)?;
                declared_type = Some(text.parse()?);
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(unreadable)?;
                upload = Some((name, mime_type, bytes));
            }
            _ => {}
        }
    }

    let declared_type = declared_type.ok_or(IntakeError::MissingField("type"))?;
    let (name, mime_type, bytes) = upload.ok_or(IntakeError::MissingField("file"))?;

    let file = ingest(
        &bytes,
        declared_type,
        name,
        mime_type.as_deref(),
        bytes.len() as u64,
    );
    let response = ProjectFileResponse::from(&file);
    let replaced = state.workspace.add_or_replace(file).map(|f| f.id);

    Ok(Created(UploadResponse {
        file: response,
        replaced,
    }))
}

/// DELETE /files/:file_id
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    state.workspace.remove(file_id)?;
    Ok(NoContent)
}
