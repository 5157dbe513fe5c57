//! Deployment notifier.
//!
//! The single write path for the active-deployment singleton. Every
//! successful publish also replaces the value held in a `watch` channel, so
//! live-reload subscribers learn about new deployments without polling.

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use crate::registry::{AssetRegistry, DeploymentId, DeploymentInfo};

/// Publishes deployment ids and fans them out to subscribers.
///
/// `DeploymentNotifier` is `Clone`; clones share the registry and the channel.
#[derive(Clone)]
pub struct DeploymentNotifier {
    registry: AssetRegistry,
    sender: watch::Sender<Option<DeploymentInfo>>,
}

impl DeploymentNotifier {
    /// Creates a notifier seeded with the registry's current deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the current deployment cannot be read.
    pub async fn new(registry: AssetRegistry) -> Result<Self> {
        let current = registry.current_deployment().await?;
        let (sender, _) = watch::channel(current);
        Ok(Self { registry, sender })
    }

    /// Records `deployment_id` as the active deployment and wakes subscribers.
    ///
    /// A read issued after this returns sees the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry write fails; subscribers are not
    /// notified in that case.
    pub async fn publish(&self, deployment_id: &DeploymentId) -> Result<DeploymentInfo> {
        let info = self.registry.publish_deployment(deployment_id).await?;
        self.sender.send_replace(Some(info.clone()));
        info!(
            deployment = %deployment_id,
            subscribers = self.sender.receiver_count(),
            "Published deployment"
        );
        Ok(info)
    }

    /// The active deployment, or `None` if nothing was ever published.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry read fails.
    pub async fn read(&self) -> Result<Option<DeploymentInfo>> {
        self.registry.current_deployment().await
    }

    /// Subscribes to deployment changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<DeploymentInfo>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
