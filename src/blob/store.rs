//! High-level `BlobStore` wrapper over backend implementations.
//!
//! Adds the signed-upload flow on top of any `BlobBackend`: a client asks
//! for an upload target, then posts bytes to it once.

use super::backend::BlobBackend;
use super::filesystem::FilesystemBlobBackend;
use super::memory::MemoryBlobBackend;
use super::types::{BlobId, BlobMeta, UPLOAD_TOKEN_TTL, UploadTarget};
use crate::error::Error;
use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;

/// Route segment under which upload tokens are redeemed.
pub const UPLOAD_ROUTE: &str = "/_siteship/upload";

/// High-level blob store interface.
///
/// # Thread Safety
///
/// `BlobStore` is `Clone` and can be shared across threads; clones share the
/// backend and the pending upload tokens.
///
/// # Example
///
/// ```ignore
/// use siteship::blob::BlobStore;
///
/// let blobs = BlobStore::memory();
/// let meta = blobs.put(Bytes::from_static(b"<html>"), Some("text/html")).await?;
/// let (data, _) = blobs.get(&meta.id).await?.unwrap();
/// ```
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
    uploads: Arc<DashMap<String, DateTime<Utc>>>,
}

impl BlobStore {
    /// Creates a `BlobStore` backed by files under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob directory or metadata database cannot be opened.
    pub fn file<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Ok(Self::custom(FilesystemBlobBackend::open(data_dir)?))
    }

    /// Creates a `BlobStore` backed by memory. All data is lost when the process exits.
    pub fn memory() -> Self {
        Self::custom(MemoryBlobBackend::new())
    }

    /// Creates a `BlobStore` with a custom backend.
    pub fn custom<B: BlobBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            uploads: Arc::new(DashMap::new()),
        }
    }

    /// Stores bytes directly and returns the new blob's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn put(&self, data: Bytes, content_type: Option<&str>) -> Result<BlobMeta> {
        self.backend.put(data, content_type).await
    }

    /// Retrieves a blob. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or the read fails.
    pub async fn get(&self, id: &BlobId) -> Result<Option<(Bytes, BlobMeta)>> {
        self.backend.get(id).await
    }

    /// Deletes a blob. `Ok(false)` when it was already gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or deletion fails.
    pub async fn delete(&self, id: &BlobId) -> Result<bool> {
        self.backend.delete(id).await
    }

    /// Retrieves blob metadata without reading content.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata cannot be read.
    pub async fn head(&self, id: &BlobId) -> Result<Option<BlobMeta>> {
        self.backend.head(id).await
    }

    /// Lists all stored blobs.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list(&self) -> Result<Vec<BlobMeta>> {
        self.backend.list().await
    }

    /// Mints a single-use upload target rooted at `base_url`.
    ///
    /// Expired tokens are pruned on every call.
    pub fn generate_upload_url(&self, base_url: &str) -> UploadTarget {
        let now = Utc::now();
        self.uploads.retain(|_, expires_at| *expires_at > now);

        let token = uuid::Uuid::new_v4().simple().to_string();
        let ttl = chrono::Duration::from_std(UPLOAD_TOKEN_TTL).unwrap_or(chrono::Duration::hours(1));
        let expires_at = now + ttl;
        self.uploads.insert(token.clone(), expires_at);

        UploadTarget {
            url: format!("{}{UPLOAD_ROUTE}/{token}", base_url.trim_end_matches('/')),
            token,
            expires_at,
        }
    }

    /// Redeems an upload token by storing `data` as a new blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UploadTokenInvalid`] when the token is unknown, already
    /// used, or expired; a storage error if the backend write fails.
    pub async fn redeem_upload(
        &self,
        token: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<BlobMeta> {
        // Remove first so concurrent redemptions of one token can't both succeed
        let (_, expires_at) = self
            .uploads
            .remove(token)
            .ok_or(Error::UploadTokenInvalid)?;
        if expires_at <= Utc::now() {
            return Err(Error::UploadTokenInvalid.into());
        }
        self.backend.put(data, content_type).await
    }

    /// Number of upload tokens that have not been redeemed or pruned.
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }
}
