//! HTTP error responses for the deploy API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Error returned by API handlers. Rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::BadRequest(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::from(Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_errors_map_to_status() {
        let cases = [
            (Error::UploadTokenInvalid, StatusCode::FORBIDDEN),
            (Error::InvalidBlobId("x".into()), StatusCode::BAD_REQUEST),
            (Error::not_found("/a"), StatusCode::NOT_FOUND),
            (Error::InvalidRequest("empty".into()), StatusCode::BAD_REQUEST),
            (Error::dangling("/a", "b1"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Storage(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_anyhow_keeps_typed_status() {
        let err = anyhow::Error::new(Error::UploadTokenInvalid).context("redeeming upload");
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
