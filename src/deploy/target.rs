//! Delivery targets: where a file set gets published.
//!
//! - [`StorageTarget`]: blob store plus commit protocol of a siteship site
//! - [`EdgeTarget`]: a third-party edge provider; the site is only told
//!   which deployment went live

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use indicatif::ProgressBar;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::discovery::{FileSet, LocalFile};
use super::http::call_empty;
use super::report::{DeployError, DeployReport};
use super::site::{CLIENT_TIMEOUT, SiteApi};
use crate::blob::BlobId;
use crate::config::EdgeConfig;
use crate::registry::DeploymentId;
use crate::reliability::retry::RetryConfig;
use crate::telemetry::record_cleanup_failure;

/// Header carrying the deployment id on edge uploads.
pub const DEPLOYMENT_ID_HEADER: &str = "X-Deployment-Id";

/// Per-run inputs handed to a target.
pub struct DeployContext {
    pub deployment_id: DeploymentId,
    pub progress: ProgressBar,
}

impl DeployContext {
    pub fn new(deployment_id: DeploymentId) -> Self {
        Self {
            deployment_id,
            progress: ProgressBar::hidden(),
        }
    }
}

/// Publishes a file set and reports where the site now lives.
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Publishes every file and activates the deployment.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Aborted`] when a commit step fails.
    async fn publish(&self, files: &FileSet, ctx: &DeployContext)
    -> Result<DeployReport, DeployError>;
}

async fn read_file(file: &LocalFile) -> Result<Bytes> {
    let data = tokio::fs::read(&file.fs_path)
        .await
        .with_context(|| format!("Failed to read {}", file.fs_path.display()))?;
    Ok(Bytes::from(data))
}

fn aborted(committed: usize) -> impl FnOnce(anyhow::Error) -> DeployError {
    move |source| DeployError::Aborted { committed, source }
}

// ============================================================================
// Storage target
// ============================================================================

/// Uploads into a site's blob store and drives the commit protocol.
///
/// Per file: upload blob, upsert path, delete the displaced blob. Then
/// finalize, delete stale blobs, publish. Blob deletions are best effort.
#[derive(Clone)]
pub struct StorageTarget {
    site: Arc<dyn SiteApi>,
}

impl StorageTarget {
    pub fn new(site: Arc<dyn SiteApi>) -> Self {
        Self { site }
    }

    /// Deletes a blob the registry no longer references. Failure leaks the
    /// blob but never fails the deployment.
    async fn reclaim(&self, blob_id: &BlobId, stage: &'static str, report: &mut DeployReport) {
        match self.site.delete_blob(blob_id).await {
            Ok(()) => report.blobs_reclaimed += 1,
            Err(e) => {
                warn!(blob_id = %blob_id, stage, error = %e, "Failed to delete old blob");
                record_cleanup_failure(stage);
                report.cleanup_failures += 1;
            },
        }
    }
}

#[async_trait]
impl DeliveryTarget for StorageTarget {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn publish(
        &self,
        files: &FileSet,
        ctx: &DeployContext,
    ) -> Result<DeployReport, DeployError> {
        let deployment = &ctx.deployment_id;
        let mut report = DeployReport::new(deployment.clone(), self.site.site_url());

        for file in &files.files {
            ctx.progress.set_message(file.path.clone());
            let committed = report.files_uploaded;

            let data = read_file(file).await.map_err(aborted(committed))?;
            let size = data.len() as u64;
            let blob_id = self
                .site
                .upload_blob(data, file.content_type)
                .await
                .with_context(|| format!("Failed to upload {}", file.path))
                .map_err(aborted(committed))?;

            let upserted = self
                .site
                .upsert_path(&file.path, &blob_id, file.content_type, deployment)
                .await
                .with_context(|| format!("Failed to commit {}", file.path));
            let old_blob = match upserted {
                Ok(old) => old,
                Err(e) => {
                    // Uploaded but never referenced
                    self.reclaim(&blob_id, "uncommitted", &mut report).await;
                    return Err(aborted(committed)(e));
                },
            };

            report.files_uploaded += 1;
            report.bytes_uploaded += size;
            debug!(path = %file.path, blob_id = %blob_id, size, "Committed file");

            // A retried upsert that already landed hands back our own blob
            if let Some(old) = old_blob.filter(|old| *old != blob_id) {
                self.reclaim(&old, "replaced", &mut report).await;
            }
            ctx.progress.inc(1);
        }

        let committed = report.files_uploaded;
        let stale = self
            .site
            .finalize_deployment(deployment)
            .await
            .map_err(aborted(committed))?;
        report.assets_removed = stale.len();
        for blob_id in &stale {
            self.reclaim(blob_id, "stale", &mut report).await;
        }

        self.site
            .publish_deployment(deployment)
            .await
            .map_err(aborted(committed))?;

        info!(
            deployment = %deployment,
            files = report.files_uploaded,
            removed = report.assets_removed,
            cleanup_failures = report.cleanup_failures,
            "Storage deployment published"
        );
        Ok(report)
    }
}

// ============================================================================
// Edge target
// ============================================================================

/// Pushes files to an edge provider, activates them there, then records the
/// deployment id on the siteship site so subscribers hear about it.
///
/// Provider contract:
/// - `PUT {endpoint}/files{path}` with the raw body, its content type and
///   the `X-Deployment-Id` header
/// - `POST {endpoint}/deployments` with `{"deployment_id": ..., "files": N}`
pub struct EdgeTarget {
    client: reqwest::Client,
    edge: EdgeConfig,
    site: Arc<dyn SiteApi>,
    retry: RetryConfig,
}

impl EdgeTarget {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(edge: EdgeConfig, site: Arc<dyn SiteApi>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("siteship/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            edge,
            site,
            retry: RetryConfig::network(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.edge.endpoint.as_str().trim_end_matches('/'))
    }

    async fn push_file(&self, file: &LocalFile, deployment: &DeploymentId) -> Result<u64> {
        let data = read_file(file).await?;
        let size = data.len() as u64;
        let url = self.endpoint(&format!("/files{}", file.path));
        call_empty(&self.retry, "edge-upload", || {
            self.client
                .put(url.as_str())
                .header(CONTENT_TYPE, file.content_type)
                .header(DEPLOYMENT_ID_HEADER, deployment.as_str())
                .body(data.clone())
        })
        .await
        .with_context(|| format!("Failed to push {} to edge", file.path))?;
        Ok(size)
    }
}

#[async_trait]
impl DeliveryTarget for EdgeTarget {
    fn name(&self) -> &'static str {
        "edge"
    }

    async fn publish(
        &self,
        files: &FileSet,
        ctx: &DeployContext,
    ) -> Result<DeployReport, DeployError> {
        let deployment = &ctx.deployment_id;
        let mut report = DeployReport::new(deployment.clone(), self.edge.site_url.clone());

        for file in &files.files {
            ctx.progress.set_message(file.path.clone());
            let size = self
                .push_file(file, deployment)
                .await
                .map_err(aborted(report.files_uploaded))?;
            report.files_uploaded += 1;
            report.bytes_uploaded += size;
            ctx.progress.inc(1);
        }

        let activate = self.endpoint("/deployments");
        let body = json!({
            "deployment_id": deployment,
            "files": report.files_uploaded,
        });
        call_empty(&self.retry, "edge-activate", || {
            self.client.post(activate.as_str()).json(&body)
        })
        .await
        .context("Failed to activate edge deployment")
        .map_err(aborted(report.files_uploaded))?;

        self.site
            .publish_deployment(deployment)
            .await
            .context("Edge deployment is live but the site was not notified")
            .map_err(aborted(report.files_uploaded))?;

        info!(
            deployment = %deployment,
            files = report.files_uploaded,
            site_url = %report.site_url,
            "Edge deployment published"
        );
        Ok(report)
    }
}
