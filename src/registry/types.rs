//! Types and constants for the asset registry.

use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blob::BlobId;

/// Live assets keyed by normalized path (value: JSON `Asset`).
pub(crate) const ASSETS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("assets");

/// Singleton records and counters (value: JSON).
pub(crate) const META_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("meta");

/// Key of the deployment singleton in `META_TABLE`.
pub(crate) const DEPLOYMENT_KEY: &str = "deployment";

/// Key of the insertion sequence counter in `META_TABLE`.
pub(crate) const SEQUENCE_KEY: &str = "next_sequence";

/// Row cap for `list_assets` when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Identifier of one deployment batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Mints a new random deployment id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeploymentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One live URL path bound to a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    /// URL path, always starting with `/`. Unique among live rows.
    pub path: String,
    /// Blob holding the content; owned by this row while it is live.
    pub blob_id: BlobId,
    /// MIME type declared at upload time.
    pub content_type: String,
    /// Deployment batch that produced this row.
    pub deployment_id: DeploymentId,
    pub created_at: DateTime<Utc>,
    /// Insertion order, for display.
    pub sequence: u64,
}

/// Input to `upsert`: everything but the registry-assigned fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAsset {
    pub path: String,
    pub blob_id: BlobId,
    pub content_type: String,
    pub deployment_id: DeploymentId,
}

impl NewAsset {
    pub(crate) fn into_asset(self, sequence: u64) -> Asset {
        Asset {
            path: self.path,
            blob_id: self.blob_id,
            content_type: self.content_type,
            deployment_id: self.deployment_id,
            created_at: Utc::now(),
            sequence,
        }
    }
}

/// The active deployment pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentInfo {
    pub current_deployment_id: DeploymentId,
    pub deployed_at: DateTime<Utc>,
}
