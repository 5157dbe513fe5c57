//! # siteship
//!
//! Deploys a single-page app's build output to blob storage and serves it
//! back with SPA routing, cache headers and ETag revalidation.
//!
//! - [`registry`] - which blob is live at which path, plus the deploy commit protocol
//! - [`blob`] - blob storage and single-use upload URLs
//! - [`serve`] - request resolution: fallback, caching, bootstrap page
//! - [`notify`] - the active deployment pointer and its subscribers
//! - [`server`] - axum HTTP surface for the deploy API and the site
//! - [`deploy`] - the client side: walk a directory and publish it through a target
//! - [`commands`] - the `siteship` CLI

pub mod blob;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod mime;
pub mod notify;
pub mod paths;
pub mod registry;
pub mod reliability;
pub mod serve;
pub mod server;
pub mod telemetry;

pub use error::{Error, Result};
