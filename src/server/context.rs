//! 共享上下文与错误类型
//!
//! Holds the immutable per-server state, the error type every handler
//! returns, and the extractors that resolve the caller's workspace and
//! decode typed request bodies.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRef, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;
use crate::server::file_api::FileApiError;
use crate::server::protocol::{ErrorBody, Validate};
use crate::workspace::{ResolveError, WorkspaceResolver};

/// Header carrying the user name, set by the upstream auth layer
pub const USER_HEADER: &str = "x-devspace-user";

/// Server-wide state shared by all handlers
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub resolver: Arc<dyn WorkspaceResolver>,
}

impl AppContext {
    pub fn new(config: Config, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }
}

/// 统一应用错误类型，由 `IntoResponse` 转换为 JSON 错误响应
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Malformed request: {0}")]
    RequestDecode(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    File(#[from] FileApiError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 转换为协议 error code
    pub fn code(&self) -> &str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::RequestDecode(_) => "request_decode",
            AppError::Forbidden(_) => "forbidden",
            AppError::File(e) => match e {
                FileApiError::FileNotFound(_) => "file_not_found",
                FileApiError::AlreadyExists(_) => "already_exists",
                FileApiError::NotADirectory(_) => "not_a_directory",
                FileApiError::ImageNotServable(_) => "image_not_servable",
                FileApiError::UnsupportedKind(_) => "unsupported_kind",
                FileApiError::Io { .. } => "io_error",
            },
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::RequestDecode(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::File(e) => match e {
                FileApiError::FileNotFound(_) => StatusCode::NOT_FOUND,
                FileApiError::AlreadyExists(_) => StatusCode::CONFLICT,
                FileApiError::NotADirectory(_) | FileApiError::UnsupportedKind(_) => {
                    StatusCode::BAD_REQUEST
                }
                FileApiError::ImageNotServable(_) | FileApiError::Io { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code().to_string(),
            msg: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// 从 tokio JoinError 转换
impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task failed: {}", e))
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        AppError::Unauthenticated(e.to_string())
    }
}

/// The caller's workspace, resolved from the identity header
#[derive(Debug, Clone)]
pub struct UserWorkspace {
    pub user: String,
    pub root: PathBuf,
}

#[async_trait]
impl<S> FromRequestParts<S> for UserWorkspace
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .ok_or_else(|| AppError::Unauthenticated(format!("missing {} header", USER_HEADER)))?;

        let root = ctx.resolver.resolve(&user).map_err(|e| {
            warn!("Rejecting user [{}]: {}", user, e);
            AppError::from(e)
        })?;

        Ok(UserWorkspace { user, root })
    }
}

/// JSON body decoded into `T` and validated once
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| AppError::RequestDecode(e.body_text()))?;
        value.validate().map_err(AppError::RequestDecode)?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_codes_and_status() {
        let err = AppError::from(FileApiError::FileNotFound(PathBuf::from("/ws/a")));
        assert_eq!(err.code(), "file_not_found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::from(FileApiError::AlreadyExists(PathBuf::from("/ws/a")));
        assert_eq!(err.code(), "already_exists");
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = AppError::RequestDecode("missing field `path`".to_string());
        assert_eq!(err.code(), "request_decode");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AppError::Forbidden("bob/src/a.png".to_string());
        assert_eq!(err.code(), "forbidden");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = AppError::from(ResolveError::InvalidUser("..".to_string()));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
