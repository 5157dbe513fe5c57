//! Backend trait for the asset registry.
//!
//! Each method is one isolated transaction: concurrent calls never observe
//! each other half-applied. A whole deployment (many upserts, one
//! finalize) is not atomic.

use super::types::{Asset, DeploymentId, DeploymentInfo, NewAsset};
use anyhow::Result;
use async_trait::async_trait;

/// Storage backend for the registry tables.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Paths arrive already normalized.
#[async_trait]
pub trait RegistryBackend: Send + Sync + 'static {
    /// Exact-match lookup of the live asset at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, path: &str) -> Result<Option<Asset>>;

    /// Replaces whatever row lives at `asset.path` with a new one.
    ///
    /// Returns the removed row, if any. After this call exactly one live row
    /// exists at the path and it is the new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn replace(&self, asset: NewAsset) -> Result<Option<Asset>>;

    /// Deletes every row whose deployment differs from `current`.
    ///
    /// Returns exactly the rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn remove_stale(&self, current: &DeploymentId) -> Result<Vec<Asset>>;

    /// Up to `limit` live rows in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn list(&self, limit: usize) -> Result<Vec<Asset>>;

    /// Reads the deployment singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn deployment(&self) -> Result<Option<DeploymentInfo>>;

    /// Creates or patches the deployment singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn set_deployment(&self, id: &DeploymentId) -> Result<DeploymentInfo>;
}
