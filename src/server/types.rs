//! Request and response bodies for the deploy API.
//!
//! Shared by the server handlers and the HTTP deploy client.

use serde::{Deserialize, Serialize};

use crate::blob::BlobId;
use crate::registry::{Asset, DeploymentId};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub blob_id: BlobId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub path: String,
    pub blob_id: BlobId,
    pub content_type: String,
    pub deployment_id: DeploymentId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub old_blob_id: Option<BlobId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub deployment_id: DeploymentId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub stale_blob_ids: Vec<BlobId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishRequest {
    pub deployment_id: DeploymentId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetListResponse {
    pub assets: Vec<Asset>,
}
