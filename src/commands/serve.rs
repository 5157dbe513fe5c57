//! `siteship serve` - run the deploy API and serve the site.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::server;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.host).
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides server.port).
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Storage directory (overrides server.data_dir).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Serve 404 instead of index.html for unknown extensionless paths.
    #[arg(long)]
    pub no_spa_fallback: bool,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.data_dir {
            config.server.data_dir = Some(dir);
        }
        if self.no_spa_fallback {
            config.routes.spa_fallback = false;
        }
    }
}

/// Runs the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the overridden config is invalid or the server fails.
pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;
    server::run(&config).await
}
