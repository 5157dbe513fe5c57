//! In-memory registry backend.
//!
//! A single `RwLock` guards all tables, which gives each call the same
//! isolation a redb write transaction does.

use super::backend::RegistryBackend;
use super::types::{Asset, DeploymentId, DeploymentInfo, NewAsset};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    assets: HashMap<String, Asset>,
    next_sequence: u64,
    deployment: Option<DeploymentInfo>,
}

/// Non-persistent registry backend. All data is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live assets.
    pub fn len(&self) -> usize {
        self.tables.read().assets.len()
    }

    /// Returns true if no assets are live.
    pub fn is_empty(&self) -> bool {
        self.tables.read().assets.is_empty()
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn get(&self, path: &str) -> Result<Option<Asset>> {
        Ok(self.tables.read().assets.get(path).cloned())
    }

    async fn replace(&self, asset: NewAsset) -> Result<Option<Asset>> {
        let mut tables = self.tables.write();
        let sequence = tables.next_sequence;
        tables.next_sequence += 1;
        let path = asset.path.clone();
        Ok(tables.assets.insert(path, asset.into_asset(sequence)))
    }

    async fn remove_stale(&self, current: &DeploymentId) -> Result<Vec<Asset>> {
        let mut tables = self.tables.write();
        let stale_paths: Vec<String> = tables
            .assets
            .values()
            .filter(|asset| &asset.deployment_id != current)
            .map(|asset| asset.path.clone())
            .collect();

        let mut removed: Vec<Asset> = stale_paths
            .iter()
            .filter_map(|path| tables.assets.remove(path))
            .collect();
        removed.sort_by_key(|asset| asset.sequence);
        Ok(removed)
    }

    async fn list(&self, limit: usize) -> Result<Vec<Asset>> {
        let tables = self.tables.read();
        let mut assets: Vec<Asset> = tables.assets.values().cloned().collect();
        assets.sort_by_key(|asset| asset.sequence);
        assets.truncate(limit);
        Ok(assets)
    }

    async fn deployment(&self) -> Result<Option<DeploymentInfo>> {
        Ok(self.tables.read().deployment.clone())
    }

    async fn set_deployment(&self, id: &DeploymentId) -> Result<DeploymentInfo> {
        let info = DeploymentInfo {
            current_deployment_id: id.clone(),
            deployed_at: Utc::now(),
        };
        self.tables.write().deployment = Some(info.clone());
        Ok(info)
    }
}
