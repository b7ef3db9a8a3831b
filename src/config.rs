//! Server configuration parsing (config.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::server::classify::PublicImages;
use crate::server::tree::{TreeOptions, DEFAULT_MAX_DEPTH};

pub const DEFAULT_PORT: u16 = 47999;
pub const DEFAULT_USER_WORKSPACES: &str = "/data/user_workspaces";
pub const PORT_ENV: &str = "DEVSPACE_PORT";
pub const USER_WORKSPACES_ENV: &str = "DEVSPACE_USER_WORKSPACES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub workspace: WorkspaceConfig,
    pub tree: TreeSection,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding one sub-directory per user
    pub user_workspaces: PathBuf,
    /// Source tree inside each user directory, "" for the user directory itself
    pub src_dir: String,
    /// URL prefix under which `user_workspaces` is published for images
    pub public_prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            user_workspaces: PathBuf::from(DEFAULT_USER_WORKSPACES),
            src_dir: "src".to_string(),
            public_prefix: DEFAULT_USER_WORKSPACES.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSection {
    pub max_depth: usize,
}

impl Default for TreeSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Used when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// `<config_dir>/devspace/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("devspace").join("config.toml"))
    }

    /// Load config from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEVSPACE_PORT` / `DEVSPACE_USER_WORKSPACES` overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue(format!("{}={}", PORT_ENV, port)))?;
        }
        if let Some(dir) = lookup(USER_WORKSPACES_ENV) {
            self.workspace.user_workspaces = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree.max_depth == 0 {
            return Err(ConfigError::InvalidValue(
                "tree.max_depth must be at least 1".to_string(),
            ));
        }
        let prefix = &self.workspace.public_prefix;
        if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "workspace.public_prefix must be an absolute URL path other than '/': {}",
                prefix
            )));
        }
        Ok(())
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_depth: self.tree.max_depth,
        }
    }

    pub fn public_images(&self) -> PublicImages {
        PublicImages {
            user_workspaces: self.workspace.user_workspaces.clone(),
            prefix: self.workspace.public_prefix.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
