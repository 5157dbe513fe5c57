//! Deploy orchestrator.
//!
//! Turns a build directory into a live deployment:
//!
//! 1. [`discover`] the files (sorted, minus excludes)
//! 2. hand them to a [`DeliveryTarget`], which uploads, commits, finalizes
//!    and publishes
//!
//! Every step is idempotent, so a failed run can simply be repeated.
//! Deployments must not overlap: finalize removes whatever the running
//! deployment did not upload, including another run's files.

mod discovery;
mod http;
mod report;
mod site;
mod target;


pub use discovery::{FileSet, LocalFile, discover};
pub use http::RequestError;
pub use report::{DeployError, DeployReport};
pub use site::{CLIENT_TIMEOUT, HttpSite, LocalSite, SiteApi};
pub use target::{DEPLOYMENT_ID_HEADER, DeliveryTarget, DeployContext, EdgeTarget, StorageTarget};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;

use crate::registry::DeploymentId;

/// Inputs for one deploy run.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub dist_dir: PathBuf,
    /// Glob patterns relative to `dist_dir`.
    pub exclude: Vec<String>,
    /// Reuse an id to resume an interrupted run; a new one is minted otherwise.
    pub deployment_id: Option<DeploymentId>,
    /// Draw a progress bar (only when stderr is a terminal).
    pub show_progress: bool,
}

impl DeployOptions {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            exclude: Vec::new(),
            deployment_id: None,
            show_progress: false,
        }
    }
}

/// Discovers the build output and publishes it through `target`.
///
/// # Errors
///
/// Returns [`DeployError::Discovery`] if the directory cannot be read, or
/// [`DeployError::Aborted`] if a commit step fails.
pub async fn deploy(
    options: &DeployOptions,
    target: &dyn DeliveryTarget,
) -> Result<DeployReport, DeployError> {
    let files =
        discover(&options.dist_dir, &options.exclude).map_err(DeployError::Discovery)?;
    let deployment_id = options
        .deployment_id
        .clone()
        .unwrap_or_else(DeploymentId::generate);

    info!(
        deployment = %deployment_id,
        target = target.name(),
        files = files.len(),
        bytes = files.total_bytes(),
        dir = %options.dist_dir.display(),
        "Starting deployment"
    );

    let ctx = DeployContext {
        deployment_id,
        progress: progress_bar(files.len(), options.show_progress),
    };
    let result = target.publish(&files, &ctx).await;
    ctx.progress.finish_and_clear();
    result
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}
