//! Site serving: every request outside the deploy API.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tracing::error;

use super::super::AppState;
use crate::telemetry::record_request;

const ALLOWED_METHODS: &str = "GET, HEAD";

/// GET/HEAD of any other path - Resolve against the registry.
pub(crate) async fn serve_site(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        record_request(StatusCode::METHOD_NOT_ALLOWED.as_u16());
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOWED_METHODS)],
        )
            .into_response();
    }

    let path = percent_decode_str(uri.path()).decode_utf8_lossy();
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    match state.resolver.resolve(&path, if_none_match).await {
        Ok(mut resolved) => {
            record_request(resolved.status.as_u16());
            if method == Method::HEAD {
                resolved
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(resolved.body.len()));
                resolved = resolved.without_body();
            }
            resolved.into_response()
        },
        Err(e) => {
            error!(%path, error = %e, "Failed to resolve request");
            record_request(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        },
    }
}
