//! Framework-neutral response produced by the resolver.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use super::cache::REVALIDATE_CACHE_CONTROL;
use super::bootstrap::BOOTSTRAP_PAGE;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const NOSNIFF: &str = "nosniff";

/// Status, headers and body for one resolved request.
#[derive(Debug, Clone)]
pub struct ResolvedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResolvedResponse {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Sets a header. Values that are not valid header text are dropped.
    fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// 200 with asset bytes.
    pub(crate) fn asset(body: Bytes, content_type: &str, cache_control: &str, etag: &str) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, content_type)
            .with_header(header::CACHE_CONTROL, cache_control)
            .with_header(header::ETAG, etag)
            .with_header(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF)
            .with_body(body)
    }

    /// 304 for a matching `If-None-Match`. No body.
    pub(crate) fn not_modified(cache_control: &str, etag: &str) -> Self {
        Self::new(StatusCode::NOT_MODIFIED)
            .with_header(header::CACHE_CONTROL, cache_control)
            .with_header(header::ETAG, etag)
    }

    /// Setup instructions shown before anything is deployed.
    pub(crate) fn bootstrap() -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, TEXT_HTML)
            .with_header(header::CACHE_CONTROL, REVALIDATE_CACHE_CONTROL)
            .with_header(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF)
            .with_body(BOOTSTRAP_PAGE)
    }

    pub(crate) fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_header(header::CONTENT_TYPE, TEXT_PLAIN)
            .with_header(header::CACHE_CONTROL, REVALIDATE_CACHE_CONTROL)
            .with_body("Not Found")
    }

    /// Registry row whose blob is gone.
    pub(crate) fn dangling() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_header(header::CONTENT_TYPE, TEXT_PLAIN)
            .with_body("Asset content is missing from storage")
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|value| value.to_str().ok())
    }

    /// Drops the body, keeping status and headers (for HEAD).
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }
}

impl IntoResponse for ResolvedResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}
