//! Resolution and serving engine.
//!
//! Maps a request path to registry lookups and blob reads:
//!
//! 1. Strip the configured prefix, rewrite `/` to `/index.html`
//! 2. Look up the path; on a miss for an extensionless path, fall back to
//!    `/index.html` when SPA fallback is on
//! 3. Serve a setup page when `/index.html` itself is missing, 404 otherwise
//! 4. Answer `If-None-Match` hits with 304, read the blob, pick a cache policy
//!
//! Registry misses and dangling rows become responses. Only transport
//! failures from the stores surface as errors.

mod bootstrap;
mod cache;
mod response;

pub use cache::{
    IMMUTABLE_CACHE_CONTROL, REVALIDATE_CACHE_CONTROL, cache_control_for, etag_for,
    is_hashed_asset,
};
pub use response::ResolvedResponse;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::blob::{BlobStore, validate_blob_id};
use crate::error::{Error, Result};
use crate::paths::{has_file_extension, normalize_asset_path, strip_path_prefix};
use crate::registry::AssetRegistry;

/// Path served for `/` and for SPA fallback.
pub const INDEX_PATH: &str = "/index.html";

/// Routing options for the serving engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Mount point of the site. Stripped before lookup.
    pub path_prefix: String,
    /// Serve `/index.html` for unknown extensionless paths.
    pub spa_fallback: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/".to_string(),
            spa_fallback: true,
        }
    }
}

/// Resolves request paths against a registry and blob store.
///
/// Stateless per request; `Resolver` is `Clone` and cheap to share.
#[derive(Clone)]
pub struct Resolver {
    registry: AssetRegistry,
    blobs: BlobStore,
    routes: RouteConfig,
}

impl Resolver {
    pub fn new(registry: AssetRegistry, blobs: BlobStore, routes: RouteConfig) -> Self {
        Self {
            registry,
            blobs,
            routes,
        }
    }

    /// Resolves `request_path` to a response.
    ///
    /// `if_none_match` is compared to the ETag by exact string equality.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Storage`] if the registry or blob store
    /// cannot be reached.
    pub async fn resolve(
        &self,
        request_path: &str,
        if_none_match: Option<&str>,
    ) -> Result<ResolvedResponse> {
        let stripped = strip_path_prefix(request_path, &self.routes.path_prefix);
        let mut path = normalize_asset_path(stripped);
        if path == "/" {
            path = INDEX_PATH.to_string();
        }

        let mut asset = self.registry.get_by_path(&path).await?;
        if asset.is_none() && self.routes.spa_fallback && !has_file_extension(&path) {
            debug!(%path, "SPA fallback to index");
            path = INDEX_PATH.to_string();
            asset = self.registry.get_by_path(&path).await?;
        }

        let Some(asset) = asset else {
            if path == INDEX_PATH {
                debug!("No index deployed, serving setup page");
                return Ok(ResolvedResponse::bootstrap());
            }
            debug!(%path, "Asset not found");
            return Ok(ResolvedResponse::not_found());
        };

        let etag = etag_for(&asset.blob_id);
        let cache_control = cache_control_for(&asset.path);
        if if_none_match == Some(etag.as_str()) {
            return Ok(ResolvedResponse::not_modified(cache_control, &etag));
        }

        let blob = if validate_blob_id(&asset.blob_id).is_ok() {
            self.blobs.get(&asset.blob_id).await?
        } else {
            None
        };
        let Some((body, _meta)) = blob else {
            let err = Error::dangling(&asset.path, asset.blob_id.as_str());
            error!(error = %err, "Serving 500");
            return Ok(ResolvedResponse::dangling());
        };

        Ok(ResolvedResponse::asset(
            body,
            &asset.content_type,
            cache_control,
            &etag,
        ))
    }
}
