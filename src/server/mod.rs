//! HTTP server: the deploy API plus site serving.
//!
//! # Endpoints
//!
//! Deploy API, under [`API_PREFIX`]:
//! - `GET    /health` - Liveness
//! - `POST   /upload-url` - Mint a single-use upload URL
//! - `POST   /upload/{token}` - Upload raw bytes as a blob
//! - `DELETE /blobs/{id}` - Delete a blob
//! - `PUT    /assets` - Upsert a path
//! - `GET    /assets?limit=N` - List live assets
//! - `GET    /assets/lookup?path=P` - Look up one path
//! - `POST   /finalize` - Finalize a deployment
//! - `GET    /deployment`, `POST /deployment` - Read or publish the active deployment
//! - `GET    /events` - Deployment changes as Server-Sent Events
//!
//! Everything else is a site request, resolved by [`crate::serve::Resolver`].
//! The deploy API has no authentication; bind it to loopback or put it
//! behind a proxy.

mod error;
pub mod handlers;
pub mod types;

pub use error::AppError;
pub use handlers::deployment::DEPLOYMENT_EVENT;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::config::Config;
use crate::notify::DeploymentNotifier;
use crate::registry::AssetRegistry;
use crate::serve::{Resolver, RouteConfig};
use crate::telemetry;

/// Path prefix reserved for the deploy API.
pub const API_PREFIX: &str = "/_siteship";

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// File name of the registry database inside the data directory.
pub const REGISTRY_FILE: &str = "registry.redb";

/// Shared handler state. Every field is a cheap, shared handle.
#[derive(Clone)]
pub struct AppState {
    pub registry: AssetRegistry,
    pub blobs: BlobStore,
    pub notifier: DeploymentNotifier,
    pub resolver: Resolver,
    /// Externally visible base URL, used to build upload URLs.
    pub base_url: String,
}

impl AppState {
    /// Wires the stores together and seeds the notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the current deployment cannot be read.
    pub async fn new(
        registry: AssetRegistry,
        blobs: BlobStore,
        routes: RouteConfig,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let notifier = DeploymentNotifier::new(registry.clone()).await?;
        let resolver = Resolver::new(registry.clone(), blobs.clone(), routes);
        Ok(Self {
            registry,
            blobs,
            notifier,
            resolver,
            base_url: base_url.into(),
        })
    }

    /// In-memory state, for tests and embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if the notifier cannot be seeded.
    pub async fn memory(routes: RouteConfig, base_url: impl Into<String>) -> Result<Self> {
        Self::new(AssetRegistry::memory(), BlobStore::memory(), routes, base_url).await
    }
}

/// Builds the router: deploy API routes, site fallback, tracing and timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/upload-url", post(handlers::upload_url))
        .route(
            "/upload/{token}",
            post(handlers::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/blobs/{id}", delete(handlers::blob_delete))
        .route(
            "/assets",
            get(handlers::assets_list).put(handlers::assets_upsert),
        )
        .route("/assets/lookup", get(handlers::assets_lookup))
        .route("/finalize", post(handlers::finalize))
        .route(
            "/deployment",
            get(handlers::deployment_get).post(handlers::deployment_publish),
        )
        .route("/events", get(handlers::deployment_events));

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(handlers::serve_site)
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

async fn handle_timeout_error(_err: tower::BoxError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(json!({ "error": "Request timed out" })),
    )
}

/// Opens the stores under the configured data directory and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if storage cannot be opened, the listener cannot bind,
/// or the server fails.
pub async fn run(config: &Config) -> Result<()> {
    let data_dir = config.server.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let blobs = BlobStore::file(&data_dir)?;
    let registry = AssetRegistry::file(data_dir.join(REGISTRY_FILE))?;
    let state = AppState::new(
        registry,
        blobs,
        config.routes.clone(),
        config.server.base_url(),
    )
    .await?;

    if let Some(port) = config.server.metrics_port {
        let mut addr = config.server.bind_addr()?;
        addr.set_port(port);
        if let Err(e) = telemetry::install_metrics_exporter(addr) {
            warn!(error = %e, "Metrics disabled");
        }
    }

    let app = router(state, config.server.request_timeout());
    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        data_dir = %data_dir.display(),
        path_prefix = %config.routes.path_prefix,
        spa_fallback = config.routes.spa_fallback,
        "Serving site"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
