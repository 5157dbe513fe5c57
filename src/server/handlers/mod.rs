//! HTTP handlers, grouped by the resource they touch.

pub mod assets;
pub mod blobs;
pub mod deployment;
pub mod site;

pub(crate) use assets::{assets_list, assets_lookup, assets_upsert, finalize};
pub(crate) use blobs::{blob_delete, upload, upload_url};
pub(crate) use deployment::{deployment_events, deployment_get, deployment_publish, health};
pub(crate) use site::serve_site;
