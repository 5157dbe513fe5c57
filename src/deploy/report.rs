//! Deployment outcome and failure types.

use std::fmt;
use url::Url;

use crate::registry::DeploymentId;

/// What one deployment did.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub deployment_id: DeploymentId,
    pub site_url: Url,
    /// Files committed to the registry (or pushed to the edge).
    pub files_uploaded: usize,
    pub bytes_uploaded: u64,
    /// Paths dropped by finalize because this deployment no longer has them.
    pub assets_removed: usize,
    /// Old blobs successfully deleted.
    pub blobs_reclaimed: usize,
    /// Old blobs that could not be deleted and are now leaked.
    pub cleanup_failures: usize,
}

impl DeployReport {
    pub fn new(deployment_id: DeploymentId, site_url: Url) -> Self {
        Self {
            deployment_id,
            site_url,
            files_uploaded: 0,
            bytes_uploaded: 0,
            assets_removed: 0,
            blobs_reclaimed: 0,
            cleanup_failures: 0,
        }
    }
}

impl fmt::Display for DeployReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deployed {} to {}", self.deployment_id, self.site_url)?;
        write!(
            f,
            "  {} file(s), {} byte(s) uploaded; {} removed; {} old blob(s) reclaimed",
            self.files_uploaded, self.bytes_uploaded, self.assets_removed, self.blobs_reclaimed
        )?;
        if self.cleanup_failures > 0 {
            write!(f, "; {} cleanup failure(s)", self.cleanup_failures)?;
        }
        Ok(())
    }
}

/// Why a deployment stopped.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The build output could not be enumerated. Nothing was sent.
    #[error("failed to read build output: {0:#}")]
    Discovery(#[source] anyhow::Error),

    /// A commit step failed. Files committed before it stay live, and any
    /// path not yet re-uploaded still serves the previous deployment.
    #[error("deployment aborted after {committed} committed file(s): {source:#}")]
    Aborted {
        committed: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl DeployError {
    /// Files committed before the failure.
    pub fn committed(&self) -> usize {
        match self {
            Self::Discovery(_) => 0,
            Self::Aborted { committed, .. } => *committed,
        }
    }
}
