//! Blob id validation.
//!
//! Blob ids end up as file names in the filesystem backend, so anything that
//! is not a canonical UUID is rejected before any path is built from it.

use std::path::{Path, PathBuf};

use super::types::BlobId;
use crate::error::Error;

/// Validates that a blob id is a canonical hyphenated UUID.
///
/// # Examples
/// ```
/// use siteship::blob::{BlobId, validate_blob_id};
///
/// assert!(validate_blob_id(&BlobId::generate()).is_ok());
/// assert!(validate_blob_id(&BlobId::new("../metadata.redb")).is_err());
/// ```
pub fn validate_blob_id(id: &BlobId) -> Result<(), Error> {
    let raw = id.as_str();
    match uuid::Uuid::try_parse(raw) {
        // Reject simple/braced/urn forms so one blob has exactly one file name.
        Ok(parsed) if parsed.hyphenated().to_string() == raw => Ok(()),
        _ => Err(Error::InvalidBlobId(raw.to_string())),
    }
}

/// Returns the filesystem path for a blob under a base directory.
pub(crate) fn blob_path(base_dir: &Path, id: &BlobId) -> Result<PathBuf, Error> {
    validate_blob_id(id)?;
    Ok(base_dir.join(id.as_str()))
}
