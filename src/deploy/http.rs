//! HTTP plumbing shared by the remote site client and the edge target.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::reliability::retry::{RetryConfig, is_retryable_status, retry_async};

/// Failure of one HTTP call.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl RequestError {
    /// True for failures a retry can fix: connection problems, timeouts,
    /// throttling and gateway errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Decode(_) => false,
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sends a request and fails on non-2xx, extracting `{"error": ...}` if present.
async fn send(request: RequestBuilder) -> Result<Response, RequestError> {
    let response = request.send().await.map_err(RequestError::Transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);
    Err(RequestError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Sends with retries and decodes a JSON body.
///
/// `build` is called once per attempt.
pub(crate) async fn call_json<T, F>(
    retry: &RetryConfig,
    operation: &str,
    build: F,
) -> Result<T, RequestError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    retry_async(
        retry.clone(),
        operation,
        || {
            let request = build();
            async move {
                send(request)
                    .await?
                    .json::<T>()
                    .await
                    .map_err(RequestError::Decode)
            }
        },
        RequestError::is_transient,
    )
    .await
}

/// Sends with retries, ignoring the response body.
pub(crate) async fn call_empty<F>(
    retry: &RetryConfig,
    operation: &str,
    build: F,
) -> Result<(), RequestError>
where
    F: Fn() -> RequestBuilder,
{
    retry_async(
        retry.clone(),
        operation,
        || {
            let request = build();
            async move { send(request).await.map(drop) }
        },
        RequestError::is_transient,
    )
    .await
}
