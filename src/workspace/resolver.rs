use std::path::PathBuf;
use thiserror::Error;

use crate::config::WorkspaceConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid user name: {0}")]
    InvalidUser(String),
}

/// Resolves a user identity to that user's workspace root
pub trait WorkspaceResolver: Send + Sync {
    fn resolve(&self, user: &str) -> Result<PathBuf, ResolveError>;
}

/// 用户名会拼进路径，必须是单个普通路径段
fn validate_username(user: &str) -> Result<(), ResolveError> {
    if user.is_empty() {
        return Err(ResolveError::InvalidUser("user name is empty".to_string()));
    }
    if user.contains('/') || user.contains('\\') {
        return Err(ResolveError::InvalidUser(
            "user name contains a path separator".to_string(),
        ));
    }
    if user == "." || user == ".." {
        return Err(ResolveError::InvalidUser(
            "user name cannot be . or ..".to_string(),
        ));
    }
    if user.contains('\0') {
        return Err(ResolveError::InvalidUser(
            "user name contains a NUL byte".to_string(),
        ));
    }
    Ok(())
}

/// Directory layout `<user_workspaces>/<user>/<src_dir>`
#[derive(Debug, Clone)]
pub struct DirWorkspaceResolver {
    user_workspaces: PathBuf,
    src_dir: String,
}

impl DirWorkspaceResolver {
    pub fn new(user_workspaces: impl Into<PathBuf>, src_dir: impl Into<String>) -> Self {
        Self {
            user_workspaces: user_workspaces.into(),
            src_dir: src_dir.into(),
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.user_workspaces.clone(), config.src_dir.clone())
    }
}

impl WorkspaceResolver for DirWorkspaceResolver {
    fn resolve(&self, user: &str) -> Result<PathBuf, ResolveError> {
        validate_username(user)?;
        let mut root = self.user_workspaces.join(user);
        if !self.src_dir.is_empty() {
            root.push(&self.src_dir);
        }
        Ok(root)
    }
}
