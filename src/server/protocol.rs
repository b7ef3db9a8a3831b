use serde::Serialize;
use std::path::Path;

pub mod file;

pub use file::{
    CreateEntryRequest, DeleteEntryRequest, OpResponse, ReadFileRequest, ReadFileResponse,
    TreeResponse, WriteFileRequest,
};

/// Protocol version reported by `/health`
pub const PROTOCOL_VERSION: u32 = 1;

/// Checks run once on a decoded request, before any side effect
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Paths arrive absolute; the caller resolved them from the workspace
pub fn validate_path(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("`{}` must not be empty", field));
    }
    if value.contains('\0') {
        return Err(format!("`{}` contains a NUL byte", field));
    }
    if !Path::new(value).is_absolute() {
        return Err(format!("`{}` must be an absolute path: {}", field, value));
    }
    Ok(())
}

/// Body of every failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub msg: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub version: u32,
}
