//! `siteship assets` - list what is live.

use anyhow::Result;
use clap::Args;

use super::{SiteArgs, open_site};
use crate::config::Config;
use crate::registry::Asset;

#[derive(Debug, Args)]
pub struct AssetsArgs {
    /// Maximum rows to show (server default: 100).
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

/// Prints live assets in insertion order.
///
/// # Errors
///
/// Returns an error if the site cannot be reached.
pub async fn execute(args: AssetsArgs, config: &Config) -> Result<()> {
    let site = open_site(&args.site, config).await?;
    let assets = site.list_assets(args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
    } else if assets.is_empty() {
        println!("No assets deployed");
    } else {
        print!("{}", render_table(&assets));
    }
    Ok(())
}

fn render_table(assets: &[Asset]) -> String {
    let width = assets
        .iter()
        .map(|a| a.path.len())
        .max()
        .unwrap_or(0)
        .max("PATH".len());

    let mut out = format!("{:<width$}  {:<36}  {:<28}  DEPLOYMENT\n", "PATH", "BLOB", "TYPE");
    for asset in assets {
        out.push_str(&format!(
            "{:<width$}  {:<36}  {:<28}  {}\n",
            asset.path,
            asset.blob_id.as_str(),
            asset.content_type,
            asset.deployment_id
        ));
    }
    out
}
