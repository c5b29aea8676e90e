//! Gateway configuration.
//!
//! Built once at startup and shared read-only with every request.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8600";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML for [`Config`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory under which repositories are resolved.
    pub project_root: PathBuf,
    /// Path or name of the git executable.
    pub git_bin_path: PathBuf,
    /// Whether `git-upload-pack` (fetch/clone) is served.
    pub upload_pack: bool,
    /// Whether `git-receive-pack` (push) is served.
    pub receive_pack: bool,
    /// Path prefix stripped from every request before route matching.
    pub route_prefix: String,
    /// HTTP listen address.
    pub listen_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
    /// Log format (`pretty` or `json`).
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        let project_root = std::env::current_dir()
            .map(|cwd| cwd.join("repo"))
            .unwrap_or_default();

        Self {
            project_root,
            git_bin_path: PathBuf::from("git"),
            upload_pack: true,
            receive_pack: true,
            route_prefix: String::new(),
            listen_addr: DEFAULT_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8600))),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Creates a configuration serving repositories under `root`.
    pub fn with_project_root(root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: root.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a YAML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that cannot be expressed in the type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git_bin_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("git_bin_path is empty".to_string()));
        }

        if !self.route_prefix.is_empty() {
            if !self.route_prefix.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "route_prefix must start with '/': {}",
                    self.route_prefix
                )));
            }
            if self.route_prefix.ends_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "route_prefix must not end with '/': {}",
                    self.route_prefix
                )));
            }
        }

        Ok(())
    }
}
