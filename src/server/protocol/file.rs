//! 文件领域协议类型

use serde::{Deserialize, Serialize};

use super::{validate_path, Validate};
use crate::server::file_api::{EntryKind, ReadOutcome, BINARY_FILE_MESSAGE};
use crate::server::tree::FileNode;

/// Editor mode reported for images
pub const IMAGE_MODE: &str = "img";

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileRequest {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileRequest {
    #[serde(alias = "file")]
    pub path: String,
    #[serde(alias = "code")]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryRequest {
    pub path: String,
    #[serde(alias = "fileType")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteEntryRequest {
    pub path: String,
}

impl Validate for ReadFileRequest {
    fn validate(&self) -> Result<(), String> {
        validate_path("path", &self.path)
    }
}

impl Validate for WriteFileRequest {
    fn validate(&self) -> Result<(), String> {
        validate_path("path", &self.path)
    }
}

impl Validate for CreateEntryRequest {
    fn validate(&self) -> Result<(), String> {
        validate_path("path", &self.path)
    }
}

impl Validate for DeleteEntryRequest {
    fn validate(&self) -> Result<(), String> {
        validate_path("path", &self.path)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeResponse {
    pub success: bool,
    pub root: FileNode,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// "binary" when the file was refused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl From<ReadOutcome> for ReadFileResponse {
    fn from(outcome: ReadOutcome) -> Self {
        match outcome {
            ReadOutcome::Image {
                servable_path,
                mime,
            } => Self {
                success: true,
                mode: Some(IMAGE_MODE.to_string()),
                image_path: Some(servable_path),
                mime: Some(mime),
                ..Default::default()
            },
            ReadOutcome::Binary => Self {
                success: false,
                error: Some("binary".to_string()),
                msg: Some(BINARY_FILE_MESSAGE.to_string()),
                ..Default::default()
            },
            ReadOutcome::Text { content, mode } => Self {
                success: true,
                mode: Some(mode.to_string()),
                content: Some(content),
                ..Default::default()
            },
        }
    }
}

/// Result of write/create/delete
#[derive(Debug, Clone, Serialize)]
pub struct OpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl OpResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            msg: None,
        }
    }
}
