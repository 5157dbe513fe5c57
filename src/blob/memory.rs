//! In-memory blob backend.
//!
//! Provides a fast, non-persistent blob store using DashMap for
//! concurrent access. Ideal for testing, development, and embedded use cases.

use super::backend::BlobBackend;
use super::types::{BlobId, BlobMeta};
use super::validation::validate_blob_id;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

/// Entry stored in the memory backend.
#[derive(Clone)]
struct MemoryBlob {
    data: Bytes,
    meta: BlobMeta,
}

/// In-memory blob backend using DashMap.
///
/// All data is lost when the process exits.
///
/// # Thread Safety
///
/// `MemoryBlobBackend` is `Clone` and uses `DashMap` internally for
/// lock-free concurrent access.
#[derive(Clone, Default)]
pub struct MemoryBlobBackend {
    data: DashMap<BlobId, MemoryBlob>,
}

impl MemoryBlobBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blobs in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn put(&self, data: Bytes, content_type: Option<&str>) -> Result<BlobMeta> {
        let meta = BlobMeta::for_upload(&data, content_type);
        self.data.insert(
            meta.id.clone(),
            MemoryBlob {
                data,
                meta: meta.clone(),
            },
        );
        Ok(meta)
    }

    async fn get(&self, id: &BlobId) -> Result<Option<(Bytes, BlobMeta)>> {
        validate_blob_id(id)?;
        Ok(self.data.get(id).map(|entry| {
            let blob = entry.value();
            (blob.data.clone(), blob.meta.clone())
        }))
    }

    async fn delete(&self, id: &BlobId) -> Result<bool> {
        validate_blob_id(id)?;
        Ok(self.data.remove(id).is_some())
    }

    async fn head(&self, id: &BlobId) -> Result<Option<BlobMeta>> {
        validate_blob_id(id)?;
        Ok(self.data.get(id).map(|entry| entry.value().meta.clone()))
    }

    async fn list(&self) -> Result<Vec<BlobMeta>> {
        let mut blobs: Vec<BlobMeta> = self
            .data
            .iter()
            .map(|entry| entry.value().meta.clone())
            .collect();
        blobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(blobs)
    }
}
