//! Configuration for the siteship server and deploy client.
//!
//! Settings come from `siteship.toml`. Every section is optional:
//!
//! - [`ServerConfig`] - listener, data directory, timeouts, metrics
//! - [`RouteConfig`] - path prefix and SPA fallback
//! - [`DeployConfig`] - what to deploy and where
//! - [`EdgeConfig`] - edge provider endpoint (for `target = "edge"`)
//! - [`LoggingConfig`] - log format and level
//!
//! Defaults are suitable for local development.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub use crate::serve::RouteConfig;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "siteship.toml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// `siteship.toml` root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routes: RouteConfig,
    pub deploy: DeployConfig,
    pub edge: Option<EdgeConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Blob and registry storage. Defaults to `~/.siteship`.
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    /// Prometheus exporter port. Disabled when absent.
    pub metrics_port: Option<u16>,
    /// Externally visible base URL, used in upload URLs and deploy output.
    /// Defaults to `http://{host}:{port}`.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            metrics_port: None,
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Data directory with `~` expanded, falling back to `~/.siteship`.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".siteship"),
        }
    }

    /// Base URL clients should use to reach this server, without a trailing slash.
    pub fn base_url(&self) -> String {
        self.public_url.as_deref().map_or_else(
            || format!("http://{}:{}", self.host, self.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where deploy output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Blob store and registry behind a siteship server.
    #[default]
    Storage,
    /// Third-party edge provider; the server is only notified.
    Edge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub dist_dir: PathBuf,
    pub server_url: String,
    pub target: TargetKind,
    /// Glob patterns (relative to `dist_dir`) to skip.
    pub exclude: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            server_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            target: TargetKind::Storage,
            exclude: Vec::new(),
        }
    }
}

impl DeployConfig {
    /// # Errors
    ///
    /// Returns an error if `server_url` is not an absolute URL.
    pub fn server_url(&self) -> Result<Url> {
        Url::parse(&self.server_url)
            .with_context(|| format!("Invalid deploy.server_url: {}", self.server_url))
    }
}

/// Edge provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Provider API root; files go to `{endpoint}/files/...`.
    pub endpoint: Url,
    /// Public URL of the site once activated.
    pub site_url: Url,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads `siteship.toml` from the working directory, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            Self::load_from(CONFIG_FILE)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Port 0, or a metrics port equal to the server port
    /// - Zero request timeout
    /// - Path prefix not starting with `/`
    /// - Unparseable server URL or exclude pattern
    /// - Edge target without an `[edge]` section
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Server
        let server = &self.server;
        if server.port == 0 {
            errors.push(
                "Server port cannot be 0. Use a valid port number (1-65535)\n  \
                 Default: 8787"
                    .to_string(),
            );
        } else if server.port < 1024 {
            warnings.push(format!(
                "Server port {} is a system/privileged port (< 1024)\n  \
                 Recommendation: Use ports >= 1024 to avoid permission issues",
                server.port
            ));
        }

        if server.metrics_port == Some(server.port) {
            errors.push(format!(
                "server.metrics_port must differ from server.port (both {})",
                server.port
            ));
        }

        if server.request_timeout_secs == 0 {
            errors.push("server.request_timeout_secs cannot be 0".to_string());
        }

        match server.bind_addr() {
            Err(_) => errors.push(format!(
                "server.host '{}' is not a valid IP address",
                server.host
            )),
            Ok(addr) if !addr.ip().is_loopback() => warnings.push(format!(
                "Server listens on {} and the deploy API has no authentication\n  \
                 Recommendation: Bind to 127.0.0.1 and put a proxy in front",
                server.host
            )),
            Ok(_) => {},
        }

        if let Some(url) = &server.public_url
            && Url::parse(url).is_err()
        {
            errors.push(format!("server.public_url is not a valid URL: {url}"));
        }

        // 2. Routes
        if !self.routes.path_prefix.starts_with('/') {
            errors.push(format!(
                "routes.path_prefix must start with '/' (got: '{}')",
                self.routes.path_prefix
            ));
        }

        // 3. Deploy
        if self.deploy.server_url().is_err() {
            errors.push(format!(
                "deploy.server_url is not a valid URL: {}",
                self.deploy.server_url
            ));
        }

        for pattern in &self.deploy.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(format!("Invalid deploy.exclude pattern '{pattern}': {e}"));
            }
        }

        if self.deploy.target == TargetKind::Edge && self.edge.is_none() {
            errors.push(
                "deploy.target is \"edge\" but no [edge] section is configured\n  \
                 Add [edge] with endpoint and site_url"
                    .to_string(),
            );
        }

        if !self.deploy.dist_dir.exists() {
            warnings.push(format!(
                "Deploy directory does not exist: {}\n  \
                 Build your app first",
                self.deploy.dist_dir.display()
            ));
        }

        // Return errors if any
        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.server.metrics_port.is_none());
        assert_eq!(config.routes, RouteConfig::default());
        assert_eq!(config.routes.path_prefix, "/");
        assert!(config.routes.spa_fallback);
        assert_eq!(config.deploy.target, TargetKind::Storage);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.edge.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
host = "127.0.0.1"
port = 9000
data_dir = "/var/lib/siteship"
request_timeout_secs = 10
metrics_port = 9464

[routes]
path_prefix = "/app"
spa_fallback = false

[deploy]
dist_dir = "build"
server_url = "http://127.0.0.1:9000"
target = "edge"
exclude = ["**/.DS_Store", "*.map"]

[edge]
endpoint = "https://edge.example.com/api/sites/demo"
site_url = "https://demo.edge.example.com"

[logging]
format = "json"
level = "debug"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.data_dir(), PathBuf::from("/var/lib/siteship"));
        assert_eq!(config.server.metrics_port, Some(9464));
        assert_eq!(config.routes.path_prefix, "/app");
        assert!(!config.routes.spa_fallback);
        assert_eq!(config.deploy.target, TargetKind::Edge);
        assert_eq!(config.deploy.exclude.len(), 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        let edge = config.edge.unwrap();
        assert_eq!(edge.site_url.as_str(), "https://demo.edge.example.com/");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[routes]\nspa_fallback = false\n").unwrap();
        assert!(!config.routes.spa_fallback);
        assert_eq!(config.routes.path_prefix, "/");
    }

    #[test]
    fn test_validate_default_is_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port cannot be 0"));
    }

    #[test]
    fn test_validate_privileged_port_warns() {
        let mut config = Config::default();
        config.server.port = 80;
        let result = config.validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("privileged")));
    }

    #[test]
    fn test_validate_public_host_warns() {
        let mut config = Config::default();
        config.server.host = "0.0.0.0".to_string();
        let result = config.validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("no authentication")));
    }

    #[test]
    fn test_validate_bad_prefix() {
        let mut config = Config::default();
        config.routes.path_prefix = "app".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("path_prefix"));
    }

    #[test]
    fn test_validate_edge_without_section() {
        let mut config = Config::default();
        config.deploy.target = TargetKind::Edge;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[edge]"));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let mut config = Config::default();
        config.server.port = 0;
        config.server.request_timeout_secs = 0;
        config.deploy.exclude = vec!["[unclosed".to_string()];
        config.deploy.server_url = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port"));
        assert!(err.contains("request_timeout_secs"));
        assert!(err.contains("exclude"));
        assert!(err.contains("server_url"));
    }

    #[test]
    fn test_validate_missing_dist_dir_warns() {
        let mut config = Config::default();
        config.deploy.dist_dir = PathBuf::from("/definitely/not/here");
        let result = config.validate().unwrap();
        assert!(result.has_warnings());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[server]\nport = 9999\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::load_from(&path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_base_url() {
        let mut server = ServerConfig::default();
        assert_eq!(server.base_url(), "http://127.0.0.1:8787");
        server.public_url = Some("https://site.example.com/".to_string());
        assert_eq!(server.base_url(), "https://site.example.com");
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home(Path::new("~/sites"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("sites"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
