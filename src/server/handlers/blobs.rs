//! Blob upload and deletion handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use tracing::debug;

use super::super::AppState;
use super::super::error::AppError;
use super::super::types::UploadResponse;
use crate::blob::{BlobId, UploadTarget, validate_blob_id};

/// POST /_siteship/upload-url - Mint a single-use upload URL.
pub(crate) async fn upload_url(State(state): State<AppState>) -> Json<UploadTarget> {
    Json(state.blobs.generate_upload_url(&state.base_url))
}

/// POST /_siteship/upload/{token} - Store the raw request body as a new blob.
pub(crate) async fn upload(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let meta = state.blobs.redeem_upload(&token, body, content_type).await?;
    debug!(blob_id = %meta.id, size = meta.size, "Stored upload");
    Ok(Json(UploadResponse { blob_id: meta.id }))
}

/// DELETE /_siteship/blobs/{id} - Delete a blob; 204 whether or not it existed.
pub(crate) async fn blob_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = BlobId::new(id);
    validate_blob_id(&id)?;
    let existed = state.blobs.delete(&id).await?;
    debug!(blob_id = %id, existed, "Deleted blob");
    Ok(StatusCode::NO_CONTENT)
}
