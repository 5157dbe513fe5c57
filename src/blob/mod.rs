//! Blob store for deployed file content.
//!
//! Blobs are opaque byte payloads addressed by a [`BlobId`] minted on every
//! store. Backends:
//!
//! - **FilesystemBlobBackend**: files on disk plus redb metadata (default for the server)
//! - **MemoryBlobBackend**: DashMap-backed, for tests and embedding
//!
//! The registry only ever holds `BlobId`s; the blob store owns the bytes.
//!
//! # Async Usage
//!
//! The filesystem backend wraps its blocking IO in `spawn_blocking`, so all
//! `BlobStore` methods are safe to await from request handlers.

mod backend;
mod filesystem;
mod memory;
mod store;
mod types;
mod validation;

pub use backend::BlobBackend;
pub use filesystem::FilesystemBlobBackend;
pub use memory::MemoryBlobBackend;
pub use store::{BlobStore, UPLOAD_ROUTE};
pub use types::{BlobId, BlobMeta, DEFAULT_BLOB_CONTENT_TYPE, UPLOAD_TOKEN_TTL, UploadTarget};
pub use validation::validate_blob_id;
