//! The `siteship` command line.
//!
//! - [`serve`] - run the server (deploy API + site)
//! - [`deploy`] - publish a build directory
//! - [`assets`] - list live assets
//! - [`status`] - show the active deployment

pub mod assets;
pub mod deploy;
pub mod serve;
pub mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::deploy::{HttpSite, LocalSite, SiteApi};
use crate::notify::DeploymentNotifier;
use crate::registry::AssetRegistry;
use crate::server::REGISTRY_FILE;

/// Deploy single-page apps and serve them.
#[derive(Debug, Parser)]
#[command(name = "siteship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./siteship.toml if present).
    #[arg(long, short = 'c', global = true, env = "SITESHIP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the server.
    Serve(serve::ServeArgs),
    /// Publish a build directory.
    Deploy(deploy::DeployArgs),
    /// List live assets.
    Assets(assets::AssetsArgs),
    /// Show the active deployment.
    Status(status::StatusArgs),
}

/// Where a client command talks to.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SiteArgs {
    /// Server URL (overrides deploy.server_url).
    #[arg(long, env = "SITESHIP_SERVER")]
    pub server: Option<String>,

    /// Operate on the local data directory instead of a server.
    #[arg(long, conflicts_with = "server")]
    pub local: bool,
}

/// Loads the config, validates it and prints any warnings.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let validation = config.validate()?;
    for warning in &validation.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(config)
}

/// Opens the site a client command operates on.
///
/// With `--local` this opens the data directory in-process, which fails
/// while a server holds the registry open.
///
/// # Errors
///
/// Returns an error if a URL is invalid or local storage cannot be opened.
pub async fn open_site(args: &SiteArgs, config: &Config) -> Result<Arc<dyn SiteApi>> {
    if args.local {
        let data_dir = config.server.data_dir();
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;
        let registry = AssetRegistry::file(data_dir.join(REGISTRY_FILE))?;
        let blobs = BlobStore::file(&data_dir)?;
        let notifier = DeploymentNotifier::new(registry.clone()).await?;
        let site_url = Url::parse(&config.server.base_url())
            .with_context(|| format!("Invalid server URL: {}", config.server.base_url()))?;
        return Ok(Arc::new(LocalSite::new(registry, blobs, notifier, site_url)));
    }

    let url = match &args.server {
        Some(raw) => Url::parse(raw).with_context(|| format!("Invalid --server URL: {raw}"))?,
        None => config.deploy.server_url()?,
    };
    Ok(Arc::new(HttpSite::new(url)?))
}
