//! Asset registry handlers: the commit protocol over HTTP.

use axum::{
    Json,
    extract::{Query, State},
};

use super::super::AppState;
use super::super::error::AppError;
use super::super::types::{
    AssetListResponse, FinalizeRequest, FinalizeResponse, ListQuery, LookupQuery, UpsertRequest,
    UpsertResponse,
};
use crate::blob::validate_blob_id;
use crate::error::Error;
use crate::registry::Asset;

/// PUT /_siteship/assets - Bind a path to a blob, returning the displaced blob.
pub(crate) async fn assets_upsert(
    State(state): State<AppState>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, AppError> {
    if req.path.is_empty() {
        return Err(Error::InvalidRequest("path cannot be empty".to_string()).into());
    }
    validate_blob_id(&req.blob_id)?;

    let old_blob_id = state
        .registry
        .upsert_path(&req.path, req.blob_id, &req.content_type, &req.deployment_id)
        .await?;
    Ok(Json(UpsertResponse { old_blob_id }))
}

/// GET /_siteship/assets - List live assets in insertion order.
pub(crate) async fn assets_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AssetListResponse>, AppError> {
    let assets = state.registry.list_assets(query.limit).await?;
    Ok(Json(AssetListResponse { assets }))
}

/// GET /_siteship/assets/lookup?path=P - The live asset at a path.
pub(crate) async fn assets_lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Asset>, AppError> {
    state
        .registry
        .get_by_path(&query.path)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found(&query.path).into())
}

/// POST /_siteship/finalize - Drop rows from other deployments.
pub(crate) async fn finalize(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let stale_blob_ids = state
        .registry
        .finalize_deployment(&req.deployment_id)
        .await?;
    Ok(Json(FinalizeResponse { stale_blob_ids }))
}
