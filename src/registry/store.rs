//! The commit protocol over any `RegistryBackend`.
//!
//! A deployment advances the registry in two phases:
//!
//! 1. `upsert_path` once per file, each replacing the row at its path and
//!    handing back the blob it displaced.
//! 2. `finalize_deployment` once, deleting every row from an older
//!    deployment and handing back their blobs.
//!
//! The registry deletes rows only. Reclaiming the returned blobs is the
//! caller's job, and a failure there leaks storage without breaking the
//! path-to-blob mapping.

use super::backend::RegistryBackend;
use super::memory::MemoryRegistry;
use super::redb::RedbRegistry;
use super::types::{Asset, DEFAULT_LIST_LIMIT, DeploymentId, DeploymentInfo, NewAsset};
use crate::blob::BlobId;
use crate::paths::normalize_asset_path;
use crate::telemetry::record_registry_operation;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// High-level registry handle.
///
/// `AssetRegistry` is `Clone`; clones share the backend.
///
/// # Example
///
/// ```ignore
/// use siteship::registry::{AssetRegistry, DeploymentId};
///
/// let registry = AssetRegistry::memory();
/// let deployment = DeploymentId::generate();
/// registry.upsert_path("/index.html", blob_id, "text/html", &deployment).await?;
/// let stale = registry.finalize_deployment(&deployment).await?;
/// ```
#[derive(Clone)]
pub struct AssetRegistry {
    backend: Arc<dyn RegistryBackend>,
}

impl AssetRegistry {
    /// Creates a registry persisted in a redb file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::custom(RedbRegistry::open(path)?))
    }

    /// Creates an in-memory registry.
    pub fn memory() -> Self {
        Self::custom(MemoryRegistry::new())
    }

    /// Creates a registry with a custom backend.
    pub fn custom<B: RegistryBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Binds `path` to a new blob, replacing any live row there.
    ///
    /// Returns the displaced blob for the caller to reclaim. After this
    /// returns, exactly one live row exists at the normalized path and it
    /// carries `blob_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend transaction fails.
    pub async fn upsert_path(
        &self,
        path: &str,
        blob_id: BlobId,
        content_type: &str,
        deployment_id: &DeploymentId,
    ) -> Result<Option<BlobId>> {
        record_registry_operation("upsert");
        let path = normalize_asset_path(path);
        let previous = self
            .backend
            .replace(NewAsset {
                path: path.clone(),
                blob_id,
                content_type: content_type.to_string(),
                deployment_id: deployment_id.clone(),
            })
            .await?;

        let old_blob = previous.map(|asset| asset.blob_id);
        debug!(
            %path,
            deployment = %deployment_id,
            replaced = old_blob.is_some(),
            "Upserted asset"
        );
        Ok(old_blob)
    }

    /// Removes every asset not produced by `current` and returns their blobs.
    ///
    /// Calling this for a deployment with no upserts empties the site.
    /// Calling it twice in a row returns an empty list the second time.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend transaction fails.
    pub async fn finalize_deployment(&self, current: &DeploymentId) -> Result<Vec<BlobId>> {
        record_registry_operation("finalize");
        let removed = self.backend.remove_stale(current).await?;
        info!(
            deployment = %current,
            removed = removed.len(),
            "Finalized deployment"
        );
        Ok(removed.into_iter().map(|asset| asset.blob_id).collect())
    }

    /// Exact-match lookup of the live asset at `path` (normalized first).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<Asset>> {
        self.backend.get(&normalize_asset_path(path)).await
    }

    /// Up to `limit` live assets in insertion order
    /// (default [`DEFAULT_LIST_LIMIT`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn list_assets(&self, limit: Option<usize>) -> Result<Vec<Asset>> {
        self.backend
            .list(limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await
    }

    /// Creates or patches the deployment singleton.
    ///
    /// Prefer [`crate::notify::DeploymentNotifier::publish`], which also
    /// wakes live-reload subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn publish_deployment(&self, id: &DeploymentId) -> Result<DeploymentInfo> {
        record_registry_operation("publish");
        self.backend.set_deployment(id).await
    }

    /// The active deployment, or `None` if nothing was ever published.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn current_deployment(&self) -> Result<Option<DeploymentInfo>> {
        self.backend.deployment().await
    }
}
