//! Shared helpers for integration tests.
//!
//! - [`TestSite`] drives the router in-process with `oneshot`
//! - [`TestServer`] binds a real listener for client-side tests

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use url::Url;

use siteship::blob::BlobId;
use siteship::registry::DeploymentId;
use siteship::serve::RouteConfig;
use siteship::server::{AppState, router};

pub const TEST_BASE_URL: &str = "http://siteship.test";
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", self.text()))
    }
}

/// In-memory site behind the full router.
pub struct TestSite {
    pub state: AppState,
    app: Router,
}

impl TestSite {
    pub async fn new() -> Self {
        Self::with_routes(RouteConfig::default()).await
    }

    pub async fn with_routes(routes: RouteConfig) -> Self {
        let state = AppState::memory(routes, TEST_BASE_URL)
            .await
            .expect("Failed to build state");
        let app = router(state.clone(), TEST_TIMEOUT);
        Self { state, app }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, &[]).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).expect("valid request"))
            .await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: &serde_json::Value,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    /// Stores a blob and binds it to `path`, bypassing HTTP.
    pub async fn seed(&self, path: &str, body: &str, content_type: &str) -> BlobId {
        let meta = self
            .state
            .blobs
            .put(Bytes::from(body.to_string()), Some(content_type))
            .await
            .expect("Failed to store blob");
        self.state
            .registry
            .upsert_path(path, meta.id.clone(), content_type, &DeploymentId::from("seed"))
            .await
            .expect("Failed to upsert");
        meta.id
    }
}

/// A site served on an ephemeral loopback port.
pub struct TestServer {
    pub url: Url,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");
        let base = format!("http://{addr}");
        let state = AppState::memory(RouteConfig::default(), base.clone())
            .await
            .expect("Failed to build state");
        let app = router(state.clone(), TEST_TIMEOUT);
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: Url::parse(&base).expect("valid base URL"),
            state,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serves an arbitrary router on an ephemeral loopback port.
pub async fn spawn_router(app: Router) -> (Url, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (
        Url::parse(&format!("http://{addr}")).expect("valid URL"),
        handle,
    )
}
