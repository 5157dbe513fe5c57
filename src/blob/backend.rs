//! Backend trait for the blob store.
//!
//! Defines the interface that all blob backends must implement,
//! enabling pluggable storage (filesystem, memory, remote object stores).

use super::types::{BlobId, BlobMeta};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Backend trait for content blobs.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// A backend never reuses an id: every `put` mints a new one.
#[async_trait]
pub trait BlobBackend: Send + Sync + 'static {
    /// Stores bytes and returns the metadata of the new blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn put(&self, data: Bytes, content_type: Option<&str>) -> Result<BlobMeta>;

    /// Retrieves a blob and its metadata.
    ///
    /// # Returns
    /// * `Ok(Some((data, meta)))` - Blob found
    /// * `Ok(None)` - Blob not found
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or the read fails.
    async fn get(&self, id: &BlobId) -> Result<Option<(Bytes, BlobMeta)>>;

    /// Deletes a blob.
    ///
    /// Returns `Ok(true)` if the blob existed and was removed, `Ok(false)`
    /// if it didn't exist. Deleting an absent blob is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or deletion fails.
    async fn delete(&self, id: &BlobId) -> Result<bool>;

    /// Retrieves blob metadata without reading the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or metadata cannot be read.
    async fn head(&self, id: &BlobId) -> Result<Option<BlobMeta>>;

    /// Lists metadata for every stored blob, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    async fn list(&self) -> Result<Vec<BlobMeta>>;
}
