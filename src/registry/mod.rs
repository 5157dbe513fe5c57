//! Asset registry: which blob is live at which URL path.
//!
//! Backends:
//!
//! - **RedbRegistry**: persistent, one redb transaction per call (default for the server)
//! - **MemoryRegistry**: non-persistent, for tests and embedding
//!
//! [`AssetRegistry`] layers the deploy commit protocol on top of either one.
//!
//! # Concurrency
//!
//! Each call is isolated, but a deployment is many calls. Readers may see a
//! mix of old and new assets while one is in flight, and two deployments
//! running at once can finalize away each other's files. Deploys are
//! expected to be serialized by whoever runs them.

mod backend;
mod memory;
mod redb;
mod store;
mod types;

#[cfg(test)]
mod property_tests;

pub use backend::RegistryBackend;
pub use memory::MemoryRegistry;
pub use redb::RedbRegistry;
pub use store::AssetRegistry;
pub use types::{Asset, DEFAULT_LIST_LIMIT, DeploymentId, DeploymentInfo, NewAsset};
