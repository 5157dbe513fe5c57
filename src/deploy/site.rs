//! The core operations a deployment drives, local or over HTTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use url::Url;

use super::http::{RequestError, call_empty, call_json};
use crate::blob::{BlobId, BlobStore, UploadTarget};
use crate::notify::DeploymentNotifier;
use crate::registry::{Asset, AssetRegistry, DeploymentId, DeploymentInfo};
use crate::reliability::retry::{RetryConfig, retry_async};
use crate::server::API_PREFIX;
use crate::server::types::{
    AssetListResponse, FinalizeRequest, FinalizeResponse, PublishRequest, UploadResponse,
    UpsertRequest, UpsertResponse,
};

/// Blob store, commit protocol and notifier of one site.
#[async_trait]
pub trait SiteApi: Send + Sync {
    /// Stores bytes as a new blob.
    async fn upload_blob(&self, data: Bytes, content_type: &str) -> Result<BlobId>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete_blob(&self, id: &BlobId) -> Result<()>;

    /// Binds `path` to `blob_id`, returning the displaced blob.
    async fn upsert_path(
        &self,
        path: &str,
        blob_id: &BlobId,
        content_type: &str,
        deployment_id: &DeploymentId,
    ) -> Result<Option<BlobId>>;

    /// Drops rows from other deployments, returning their blobs.
    async fn finalize_deployment(&self, deployment_id: &DeploymentId) -> Result<Vec<BlobId>>;

    /// Makes `deployment_id` the active deployment.
    async fn publish_deployment(&self, deployment_id: &DeploymentId) -> Result<DeploymentInfo>;

    async fn current_deployment(&self) -> Result<Option<DeploymentInfo>>;

    async fn list_assets(&self, limit: Option<usize>) -> Result<Vec<Asset>>;

    /// Where the deployed site is served.
    fn site_url(&self) -> Url;
}

// ============================================================================
// In-process site
// ============================================================================

/// Drives a registry and blob store in the current process.
#[derive(Clone)]
pub struct LocalSite {
    registry: AssetRegistry,
    blobs: BlobStore,
    notifier: DeploymentNotifier,
    site_url: Url,
}

impl LocalSite {
    pub fn new(
        registry: AssetRegistry,
        blobs: BlobStore,
        notifier: DeploymentNotifier,
        site_url: Url,
    ) -> Self {
        Self {
            registry,
            blobs,
            notifier,
            site_url,
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

#[async_trait]
impl SiteApi for LocalSite {
    async fn upload_blob(&self, data: Bytes, content_type: &str) -> Result<BlobId> {
        Ok(self.blobs.put(data, Some(content_type)).await?.id)
    }

    async fn delete_blob(&self, id: &BlobId) -> Result<()> {
        self.blobs.delete(id).await.map(drop)
    }

    async fn upsert_path(
        &self,
        path: &str,
        blob_id: &BlobId,
        content_type: &str,
        deployment_id: &DeploymentId,
    ) -> Result<Option<BlobId>> {
        self.registry
            .upsert_path(path, blob_id.clone(), content_type, deployment_id)
            .await
    }

    async fn finalize_deployment(&self, deployment_id: &DeploymentId) -> Result<Vec<BlobId>> {
        self.registry.finalize_deployment(deployment_id).await
    }

    async fn publish_deployment(&self, deployment_id: &DeploymentId) -> Result<DeploymentInfo> {
        self.notifier.publish(deployment_id).await
    }

    async fn current_deployment(&self) -> Result<Option<DeploymentInfo>> {
        self.notifier.read().await
    }

    async fn list_assets(&self, limit: Option<usize>) -> Result<Vec<Asset>> {
        self.registry.list_assets(limit).await
    }

    fn site_url(&self) -> Url {
        self.site_url.clone()
    }
}

// ============================================================================
// Remote site
// ============================================================================

/// Per-request timeout for deploy API calls.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to a siteship server's deploy API.
#[derive(Clone)]
pub struct HttpSite {
    client: reqwest::Client,
    base: Url,
    retry: RetryConfig,
}

impl HttpSite {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("siteship/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base,
            retry: RetryConfig::network(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}{API_PREFIX}{path}",
            self.base.as_str().trim_end_matches('/')
        );
        Url::parse(&raw).with_context(|| format!("Invalid API URL: {raw}"))
    }

    /// Mints an upload token and spends it. Tokens are single use, so a
    /// retry starts over from minting.
    async fn upload_once(
        &self,
        mint: &Url,
        data: &Bytes,
        content_type: &str,
    ) -> Result<BlobId, RequestError> {
        let once = RetryConfig::none();
        let target: UploadTarget =
            call_json(&once, "upload-url", || self.client.post(mint.clone())).await?;
        let uploaded: UploadResponse = call_json(&once, "upload", || {
            self.client
                .post(target.url.as_str())
                .header(CONTENT_TYPE, content_type)
                .body(data.clone())
        })
        .await?;
        Ok(uploaded.blob_id)
    }
}

#[async_trait]
impl SiteApi for HttpSite {
    async fn upload_blob(&self, data: Bytes, content_type: &str) -> Result<BlobId> {
        let mint = self.endpoint("/upload-url")?;
        retry_async(
            self.retry.clone(),
            "upload",
            || self.upload_once(&mint, &data, content_type),
            RequestError::is_transient,
        )
        .await
        .context("Failed to upload blob")
    }

    async fn delete_blob(&self, id: &BlobId) -> Result<()> {
        let url = self.endpoint(&format!("/blobs/{id}"))?;
        call_empty(&self.retry, "delete-blob", || self.client.delete(url.clone()))
            .await
            .with_context(|| format!("Failed to delete blob {id}"))
    }

    async fn upsert_path(
        &self,
        path: &str,
        blob_id: &BlobId,
        content_type: &str,
        deployment_id: &DeploymentId,
    ) -> Result<Option<BlobId>> {
        let url = self.endpoint("/assets")?;
        let body = UpsertRequest {
            path: path.to_string(),
            blob_id: blob_id.clone(),
            content_type: content_type.to_string(),
            deployment_id: deployment_id.clone(),
        };
        let response: UpsertResponse = call_json(&self.retry, "upsert", || {
            self.client.put(url.clone()).json(&body)
        })
        .await
        .with_context(|| format!("Failed to upsert {path}"))?;
        Ok(response.old_blob_id)
    }

    async fn finalize_deployment(&self, deployment_id: &DeploymentId) -> Result<Vec<BlobId>> {
        let url = self.endpoint("/finalize")?;
        let body = FinalizeRequest {
            deployment_id: deployment_id.clone(),
        };
        let response: FinalizeResponse = call_json(&self.retry, "finalize", || {
            self.client.post(url.clone()).json(&body)
        })
        .await
        .context("Failed to finalize deployment")?;
        Ok(response.stale_blob_ids)
    }

    async fn publish_deployment(&self, deployment_id: &DeploymentId) -> Result<DeploymentInfo> {
        let url = self.endpoint("/deployment")?;
        let body = PublishRequest {
            deployment_id: deployment_id.clone(),
        };
        call_json(&self.retry, "publish", || {
            self.client.post(url.clone()).json(&body)
        })
        .await
        .context("Failed to publish deployment")
    }

    async fn current_deployment(&self) -> Result<Option<DeploymentInfo>> {
        let url = self.endpoint("/deployment")?;
        call_json(&self.retry, "deployment", || self.client.get(url.clone()))
            .await
            .context("Failed to read current deployment")
    }

    async fn list_assets(&self, limit: Option<usize>) -> Result<Vec<Asset>> {
        let mut url = self.endpoint("/assets")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        let response: AssetListResponse =
            call_json(&self.retry, "list-assets", || self.client.get(url.clone()))
                .await
                .context("Failed to list assets")?;
        Ok(response.assets)
    }

    fn site_url(&self) -> Url {
        self.base.clone()
    }
}
