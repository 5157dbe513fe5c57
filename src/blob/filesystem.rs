//! Filesystem-backed blob backend.
//!
//! Blob bytes live in `<dir>/blobs/<id>`; metadata is tracked in
//! `<dir>/blobs.redb` for listing without touching every file.

use super::backend::BlobBackend;
use super::types::{BLOBS_TABLE, BlobId, BlobMeta, DEFAULT_BLOB_CONTENT_TYPE};
use super::validation::blob_path;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem-backed blob backend.
///
/// # Thread Safety
///
/// `FilesystemBlobBackend` is `Clone` and can be shared across threads. The
/// underlying database handles concurrent access safely.
#[derive(Clone)]
pub struct FilesystemBlobBackend {
    blobs_dir: PathBuf,
    db: Arc<Database>,
}

impl FilesystemBlobBackend {
    /// Creates or opens the blob backend under the given data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The blob directory cannot be created
    /// - The metadata database cannot be opened or initialized
    /// - Startup reconciliation fails
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let blobs_dir = data_dir.join("blobs");

        fs::create_dir_all(&blobs_dir).with_context(|| {
            format!("Failed to create blob directory: {}", blobs_dir.display())
        })?;

        let db_path = data_dir.join("blobs.redb");
        let db = Database::create(&db_path).with_context(|| {
            format!("Failed to open blob metadata database: {}", db_path.display())
        })?;

        // Initialize metadata table
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(BLOBS_TABLE)
                .context("Failed to initialize blobs table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        let backend = Self {
            blobs_dir,
            db: Arc::new(db),
        };
        backend.reconcile_sync()?;
        Ok(backend)
    }

    /// Drops metadata rows whose blob file is gone.
    ///
    /// Files without metadata are left alone: `get` reconstructs minimal
    /// metadata for them.
    fn reconcile_sync(&self) -> Result<()> {
        let mut orphaned = Vec::new();
        {
            let read_txn = self
                .db
                .begin_read()
                .context("Failed to begin read transaction for reconciliation")?;
            let table = read_txn
                .open_table(BLOBS_TABLE)
                .context("Failed to open blobs table for reconciliation")?;

            for item in table.iter().context("Failed to iterate blobs table")? {
                let (key, _) = item.context("Failed to read blob entry")?;
                let id = BlobId::new(key.value());
                let exists = blob_path(&self.blobs_dir, &id).is_ok_and(|p| p.is_file());
                if !exists {
                    orphaned.push(id);
                }
            }
        }

        if orphaned.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = orphaned.len(), "Removing orphaned blob metadata");
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .context("Failed to open blobs table")?;
            for id in &orphaned {
                table
                    .remove(id.as_str())
                    .with_context(|| format!("Failed to remove blob metadata: {id}"))?;
            }
        }
        write_txn
            .commit()
            .context("Failed to commit reconciliation transaction")?;
        Ok(())
    }

    fn load_meta(&self, id: &BlobId) -> Result<Option<BlobMeta>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(BLOBS_TABLE)
            .context("Failed to open blobs table")?;

        match table
            .get(id.as_str())
            .with_context(|| format!("Failed to read blob metadata: {id}"))?
        {
            Some(guard) => {
                let meta = serde_json::from_slice(guard.value())
                    .with_context(|| format!("Failed to deserialize blob metadata: {id}"))?;
                Ok(Some(meta))
            },
            None => Ok(None),
        }
    }

    /// Metadata for a file whose database row is missing.
    fn reconstruct_meta(id: &BlobId, data: &[u8]) -> BlobMeta {
        BlobMeta {
            id: id.clone(),
            size: data.len() as u64,
            content_type: DEFAULT_BLOB_CONTENT_TYPE.to_string(),
            digest: hex::encode(blake3::hash(data).as_bytes()),
            created_at: Utc::now(),
        }
    }

    fn put_sync(&self, data: &[u8], content_type: Option<&str>) -> Result<BlobMeta> {
        let meta = BlobMeta::for_upload(data, content_type);
        let file_path = blob_path(&self.blobs_dir, &meta.id)?;

        // Write to a temp name first so readers never observe a partial blob
        let tmp_path = file_path.with_extension("partial");
        fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write blob: {}", meta.id))?;
        fs::rename(&tmp_path, &file_path)
            .with_context(|| format!("Failed to finalize blob: {}", meta.id))?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .context("Failed to open blobs table")?;
            let json = serde_json::to_vec(&meta).context("Failed to serialize blob metadata")?;
            table
                .insert(meta.id.as_str(), json.as_slice())
                .with_context(|| format!("Failed to insert blob metadata: {}", meta.id))?;
        }
        write_txn
            .commit()
            .context("Failed to commit blob metadata transaction")?;

        Ok(meta)
    }

    fn get_sync(&self, id: &BlobId) -> Result<Option<(Bytes, BlobMeta)>> {
        let file_path = blob_path(&self.blobs_dir, id)?;

        let data = match fs::read(&file_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read blob: {id}")),
        };

        let meta = match self.load_meta(id)? {
            Some(meta) => meta,
            None => Self::reconstruct_meta(id, &data),
        };

        Ok(Some((Bytes::from(data), meta)))
    }

    fn delete_sync(&self, id: &BlobId) -> Result<bool> {
        let file_path = blob_path(&self.blobs_dir, id)?;

        let existed = match fs::remove_file(&file_path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e).with_context(|| format!("Failed to delete blob: {id}")),
        };

        // Remove metadata either way so orphaned rows don't linger
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(BLOBS_TABLE)
                .context("Failed to open blobs table")?;
            table
                .remove(id.as_str())
                .with_context(|| format!("Failed to remove blob metadata: {id}"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit blob removal transaction")?;

        Ok(existed)
    }

    fn head_sync(&self, id: &BlobId) -> Result<Option<BlobMeta>> {
        let file_path = blob_path(&self.blobs_dir, id)?;
        if !file_path.is_file() {
            return Ok(None);
        }
        if let Some(meta) = self.load_meta(id)? {
            return Ok(Some(meta));
        }
        let data = fs::read(&file_path).with_context(|| format!("Failed to read blob: {id}"))?;
        Ok(Some(Self::reconstruct_meta(id, &data)))
    }

    fn list_sync(&self) -> Result<Vec<BlobMeta>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(BLOBS_TABLE)
            .context("Failed to open blobs table")?;

        let mut blobs = Vec::new();
        for item in table.iter().context("Failed to iterate blobs table")? {
            let (_, value) = item.context("Failed to read blob entry")?;
            // Skip corrupted entries instead of failing the entire listing
            if let Ok(meta) = serde_json::from_slice::<BlobMeta>(value.value()) {
                blobs.push(meta);
            }
        }
        blobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(blobs)
    }
}

#[async_trait]
impl BlobBackend for FilesystemBlobBackend {
    async fn put(&self, data: Bytes, content_type: Option<&str>) -> Result<BlobMeta> {
        let backend = self.clone();
        let content_type = content_type.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || backend.put_sync(&data, content_type.as_deref()))
            .await
            .context("Task join error")?
    }

    async fn get(&self, id: &BlobId) -> Result<Option<(Bytes, BlobMeta)>> {
        let backend = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || backend.get_sync(&id))
            .await
            .context("Task join error")?
    }

    async fn delete(&self, id: &BlobId) -> Result<bool> {
        let backend = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || backend.delete_sync(&id))
            .await
            .context("Task join error")?
    }

    async fn head(&self, id: &BlobId) -> Result<Option<BlobMeta>> {
        let backend = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || backend.head_sync(&id))
            .await
            .context("Task join error")?
    }

    async fn list(&self) -> Result<Vec<BlobMeta>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.list_sync())
            .await
            .context("Task join error")?
    }
}
