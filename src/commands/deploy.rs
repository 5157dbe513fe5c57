//! `siteship deploy` - publish a build directory.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use super::{SiteArgs, open_site};
use crate::config::{Config, TargetKind};
use crate::deploy::{DeliveryTarget, DeployOptions, EdgeTarget, StorageTarget, deploy};
use crate::registry::DeploymentId;

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Build output directory (overrides deploy.dist_dir).
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Delivery target (overrides deploy.target).
    #[arg(long, value_enum)]
    pub target: Option<TargetKind>,

    /// Extra glob patterns to skip; added to deploy.exclude.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Reuse a deployment id to resume an interrupted run.
    #[arg(long)]
    pub deployment_id: Option<String>,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl DeployArgs {
    fn options(&self, config: &Config) -> DeployOptions {
        let mut exclude = config.deploy.exclude.clone();
        exclude.extend(self.exclude.iter().cloned());
        DeployOptions {
            dist_dir: self
                .dir
                .clone()
                .unwrap_or_else(|| config.deploy.dist_dir.clone()),
            exclude,
            deployment_id: self.deployment_id.as_deref().map(DeploymentId::from),
            show_progress: true,
        }
    }
}

/// Publishes the build directory through the configured target.
///
/// # Errors
///
/// Returns an error if the site cannot be reached or the deployment aborts.
pub async fn execute(args: DeployArgs, config: &Config) -> Result<()> {
    let options = args.options(config);
    let site = open_site(&args.site, config).await?;

    let target: Box<dyn DeliveryTarget> = match args.target.unwrap_or(config.deploy.target) {
        TargetKind::Storage => Box::new(StorageTarget::new(Arc::clone(&site))),
        TargetKind::Edge => {
            let edge = config
                .edge
                .clone()
                .context("Edge target requires an [edge] section in siteship.toml")?;
            Box::new(EdgeTarget::new(edge, site)?)
        },
    };

    match deploy(&options, target.as_ref()).await {
        Ok(report) => {
            println!("{report}");
            Ok(())
        },
        Err(e) => {
            if e.committed() > 0 {
                eprintln!(
                    "{} file(s) are already live. Re-run with --deployment-id to resume.",
                    e.committed()
                );
            }
            Err(e.into())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeployArgs {
        DeployArgs {
            dir: None,
            target: None,
            exclude: Vec::new(),
            deployment_id: None,
            site: SiteArgs::default(),
        }
    }

    #[test]
    fn test_options_merge_flags_with_config() {
        let mut config = Config::default();
        config.deploy.exclude = vec!["**/.DS_Store".to_string()];

        let options = DeployArgs {
            dir: Some(PathBuf::from("build")),
            exclude: vec!["*.map".to_string()],
            deployment_id: Some("d7".to_string()),
            ..args()
        }
        .options(&config);

        assert_eq!(options.dist_dir, PathBuf::from("build"));
        assert_eq!(options.exclude, vec!["**/.DS_Store", "*.map"]);
        assert_eq!(options.deployment_id, Some(DeploymentId::from("d7")));
    }

    #[test]
    fn test_options_default_to_config() {
        let options = args().options(&Config::default());
        assert_eq!(options.dist_dir, PathBuf::from("dist"));
        assert!(options.exclude.is_empty());
        assert!(options.deployment_id.is_none());
    }

    #[tokio::test]
    async fn test_edge_without_section_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.data_dir = Some(tmp.path().join("data"));
        let args = DeployArgs {
            target: Some(TargetKind::Edge),
            site: SiteArgs {
                server: None,
                local: true,
            },
            ..args()
        };

        let err = execute(args, &config).await.unwrap_err();
        assert!(err.to_string().contains("[edge]"));
    }

    #[tokio::test]
    async fn test_local_deploy_publishes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("index.html"), "<h1>hi</h1>").unwrap();

        let mut config = Config::default();
        config.server.data_dir = Some(tmp.path().join("data"));
        let args = DeployArgs {
            dir: Some(dist),
            deployment_id: Some("d1".to_string()),
            site: SiteArgs {
                server: None,
                local: true,
            },
            ..args()
        };
        execute(args, &config).await.unwrap();

        let site = open_site(
            &SiteArgs {
                server: None,
                local: true,
            },
            &config,
        )
        .await
        .unwrap();
        let assets = site.list_assets(None).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].path, "/index.html");
    }
}
