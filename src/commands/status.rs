//! `siteship status` - show the active deployment.

use anyhow::Result;
use clap::Args;

use super::{SiteArgs, open_site};
use crate::config::Config;

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

/// Prints the active deployment id and when it was published.
///
/// # Errors
///
/// Returns an error if the site cannot be reached.
pub async fn execute(args: StatusArgs, config: &Config) -> Result<()> {
    let site = open_site(&args.site, config).await?;
    match site.current_deployment().await? {
        Some(info) => {
            println!("Site:        {}", site.site_url());
            println!("Deployment:  {}", info.current_deployment_id);
            println!("Deployed at: {}", info.deployed_at.to_rfc3339());
        },
        None => println!("Nothing deployed to {} yet", site.site_url()),
    }
    Ok(())
}
