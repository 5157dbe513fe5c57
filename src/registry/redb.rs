//! Redb-backed registry backend.
//!
//! Every registry call runs in a single redb transaction, so each upsert,
//! finalize and publish is atomic and durable on its own.

use super::backend::RegistryBackend;
use super::types::{
    ASSETS_TABLE, Asset, DEPLOYMENT_KEY, DeploymentId, DeploymentInfo, META_TABLE, NewAsset,
    SEQUENCE_KEY,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Persistent registry backend with ACID guarantees.
///
/// # Thread Safety
///
/// `RedbRegistry` is `Clone` and can be shared across threads. redb
/// serializes write transactions internally.
#[derive(Clone)]
pub struct RedbRegistry {
    db: Arc<Database>,
}

impl RedbRegistry {
    /// Opens or creates a registry database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, lock held by another process)
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create registry directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open registry database: {}", path.display()))?;

        // Initialize tables on first open to ensure they exist for reads
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _assets = write_txn
                .open_table(ASSETS_TABLE)
                .context("Failed to initialize assets table")?;
            let _meta = write_txn
                .open_table(META_TABLE)
                .context("Failed to initialize meta table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Reads and bumps the insertion counter inside an open write transaction.
    fn next_sequence(meta: &mut Table<'_, &'static str, &'static [u8]>) -> Result<u64> {
        let current = match meta
            .get(SEQUENCE_KEY)
            .context("Failed to read sequence counter")?
        {
            Some(guard) => serde_json::from_slice::<u64>(guard.value())
                .context("Failed to deserialize sequence counter")?,
            None => 0,
        };
        let next = serde_json::to_vec(&(current + 1)).context("Failed to serialize counter")?;
        meta.insert(SEQUENCE_KEY, next.as_slice())
            .context("Failed to update sequence counter")?;
        Ok(current)
    }

    fn get_sync(&self, path: &str) -> Result<Option<Asset>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ASSETS_TABLE)
            .context("Failed to open assets table")?;

        match table
            .get(path)
            .with_context(|| format!("Failed to read asset '{path}'"))?
        {
            Some(guard) => {
                let asset = serde_json::from_slice(guard.value())
                    .with_context(|| format!("Failed to deserialize asset '{path}'"))?;
                Ok(Some(asset))
            },
            None => Ok(None),
        }
    }

    fn replace_sync(&self, asset: NewAsset) -> Result<Option<Asset>> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let previous = {
            let mut meta = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            let sequence = Self::next_sequence(&mut meta)?;

            let mut assets = write_txn
                .open_table(ASSETS_TABLE)
                .context("Failed to open assets table")?;

            let previous = match assets
                .remove(asset.path.as_str())
                .with_context(|| format!("Failed to remove asset '{}'", asset.path))?
            {
                Some(guard) => Some(
                    serde_json::from_slice::<Asset>(guard.value())
                        .with_context(|| format!("Failed to deserialize asset '{}'", asset.path))?,
                ),
                None => None,
            };

            let row = asset.into_asset(sequence);
            let json = serde_json::to_vec(&row).context("Failed to serialize asset")?;
            assets
                .insert(row.path.as_str(), json.as_slice())
                .with_context(|| format!("Failed to insert asset '{}'", row.path))?;

            previous
        };

        write_txn
            .commit()
            .context("Failed to commit upsert transaction")?;

        Ok(previous)
    }

    fn remove_stale_sync(&self, current: &DeploymentId) -> Result<Vec<Asset>> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let mut removed = Vec::new();
        {
            let mut assets = write_txn
                .open_table(ASSETS_TABLE)
                .context("Failed to open assets table")?;

            for item in assets.iter().context("Failed to iterate assets table")? {
                let (_, value) = item.context("Failed to read asset entry")?;
                let asset: Asset = serde_json::from_slice(value.value())
                    .context("Failed to deserialize asset")?;
                if &asset.deployment_id != current {
                    removed.push(asset);
                }
            }

            for asset in &removed {
                assets
                    .remove(asset.path.as_str())
                    .with_context(|| format!("Failed to remove asset '{}'", asset.path))?;
            }
        }

        write_txn
            .commit()
            .context("Failed to commit finalize transaction")?;

        removed.sort_by_key(|asset| asset.sequence);
        Ok(removed)
    }

    fn list_sync(&self, limit: usize) -> Result<Vec<Asset>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ASSETS_TABLE)
            .context("Failed to open assets table")?;

        let mut assets = Vec::new();
        for item in table.iter().context("Failed to iterate assets table")? {
            let (key, value) = item.context("Failed to read asset entry")?;
            // Skip corrupted entries instead of failing the entire listing
            match serde_json::from_slice::<Asset>(value.value()) {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!(path = key.value(), error = %e, "Skipping unreadable asset row"),
            }
        }
        assets.sort_by_key(|asset| asset.sequence);
        assets.truncate(limit);
        Ok(assets)
    }

    fn deployment_sync(&self) -> Result<Option<DeploymentInfo>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(META_TABLE)
            .context("Failed to open meta table")?;

        match table
            .get(DEPLOYMENT_KEY)
            .context("Failed to read deployment record")?
        {
            Some(guard) => Ok(Some(
                serde_json::from_slice(guard.value())
                    .context("Failed to deserialize deployment record")?,
            )),
            None => Ok(None),
        }
    }

    fn set_deployment_sync(&self, id: &DeploymentId) -> Result<DeploymentInfo> {
        let info = DeploymentInfo {
            current_deployment_id: id.clone(),
            deployed_at: Utc::now(),
        };

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            let json = serde_json::to_vec(&info).context("Failed to serialize deployment")?;
            table
                .insert(DEPLOYMENT_KEY, json.as_slice())
                .context("Failed to write deployment record")?;
        }
        write_txn
            .commit()
            .context("Failed to commit deployment transaction")?;

        Ok(info)
    }
}

#[async_trait]
impl RegistryBackend for RedbRegistry {
    async fn get(&self, path: &str) -> Result<Option<Asset>> {
        let backend = self.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || backend.get_sync(&path))
            .await
            .context("Task join error")?
    }

    async fn replace(&self, asset: NewAsset) -> Result<Option<Asset>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.replace_sync(asset))
            .await
            .context("Task join error")?
    }

    async fn remove_stale(&self, current: &DeploymentId) -> Result<Vec<Asset>> {
        let backend = self.clone();
        let current = current.clone();
        tokio::task::spawn_blocking(move || backend.remove_stale_sync(&current))
            .await
            .context("Task join error")?
    }

    async fn list(&self, limit: usize) -> Result<Vec<Asset>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.list_sync(limit))
            .await
            .context("Task join error")?
    }

    async fn deployment(&self) -> Result<Option<DeploymentInfo>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.deployment_sync())
            .await
            .context("Task join error")?
    }

    async fn set_deployment(&self, id: &DeploymentId) -> Result<DeploymentInfo> {
        let backend = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || backend.set_deployment_sync(&id))
            .await
            .context("Task join error")?
    }
}
