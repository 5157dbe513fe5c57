//! Types and constants for the blob store.

use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Table for blob metadata storage (blob id -> JSON `BlobMeta`).
pub(crate) const BLOBS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("blobs");

/// How long a minted upload token stays redeemable.
pub const UPLOAD_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Content type recorded when the uploader does not declare one.
pub const DEFAULT_BLOB_CONTENT_TYPE: &str = "application/octet-stream";

/// Opaque reference to a stored blob.
///
/// Minted fresh on every `put`, so two uploads of identical bytes get
/// distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    /// Mints a new random blob id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing id string without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Metadata for a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMeta {
    /// Blob identifier.
    pub id: BlobId,
    /// Size in bytes.
    pub size: u64,
    /// MIME type declared at upload time.
    pub content_type: String,
    /// BLAKE3 digest of the content, hex encoded.
    pub digest: String,
    /// Timestamp when the blob was stored.
    pub created_at: DateTime<Utc>,
}

impl BlobMeta {
    /// Builds metadata for freshly uploaded bytes under a new id.
    pub(crate) fn for_upload(data: &[u8], content_type: Option<&str>) -> Self {
        Self {
            id: BlobId::generate(),
            size: data.len() as u64,
            content_type: content_type
                .unwrap_or(DEFAULT_BLOB_CONTENT_TYPE)
                .to_string(),
            digest: hex::encode(blake3::hash(data).as_bytes()),
            created_at: Utc::now(),
        }
    }
}

/// Where and how a client uploads bytes for a single blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadTarget {
    /// Absolute URL accepting a single `POST` of the blob bytes.
    pub url: String,
    /// Single-use token embedded in `url`.
    pub token: String,
    /// Expiry of the token.
    pub expires_at: DateTime<Utc>,
}
