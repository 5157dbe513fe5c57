//! Typed errors for the registry, blob store and serving engine.
//!
//! Library seams that talk to databases or the filesystem return
//! `anyhow::Result` with context; these variants cover the outcomes callers
//! are expected to branch on or map to an HTTP status.

/// Result type for siteship operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Registry miss with no fallback that applies.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The registry holds a row whose blob is gone from the blob store.
    #[error("asset '{path}' references missing blob {blob_id}")]
    DanglingReference { path: String, blob_id: String },

    /// Upload token is unknown, already redeemed, or expired.
    #[error("upload token is invalid or expired")]
    UploadTokenInvalid,

    /// Blob id failed syntax validation.
    #[error("invalid blob id: {0}")]
    InvalidBlobId(String),

    /// Malformed request from a client.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Backing store failure (database, blob transport).
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a dangling reference error.
    pub fn dangling(path: impl Into<String>, blob_id: impl Into<String>) -> Self {
        Self::DanglingReference {
            path: path.into(),
            blob_id: blob_id.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::UploadTokenInvalid => 403,
            Self::InvalidBlobId(_) | Self::InvalidRequest(_) => 400,
            Self::DanglingReference { .. } | Self::Storage(_) => 500,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        // Preserve typed errors that were wrapped on the way up.
        match err.downcast::<Error>() {
            Ok(typed) => typed,
            Err(err) => Self::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::not_found("/x").status_code(), 404);
        assert_eq!(Error::dangling("/x", "b1").status_code(), 500);
        assert_eq!(Error::UploadTokenInvalid.status_code(), 403);
        assert_eq!(Error::InvalidBlobId("..".into()).status_code(), 400);
        assert_eq!(Error::InvalidRequest("empty path".into()).status_code(), 400);
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_variant() {
        let wrapped = anyhow::Error::from(Error::UploadTokenInvalid);
        let back = Error::from(wrapped);
        assert!(matches!(back, Error::UploadTokenInvalid));

        let plain = Error::from(anyhow::anyhow!("disk full"));
        assert!(matches!(plain, Error::Storage(_)));
    }
}
