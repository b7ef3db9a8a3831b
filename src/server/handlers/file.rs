use axum::{
    extract::{Path as UrlPath, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::server::context::{AppContext, AppError, UserWorkspace, ValidatedJson};
use crate::server::classify;
use crate::server::file_api::{self, FileApiError};
use crate::server::protocol::{
    CreateEntryRequest, DeleteEntryRequest, OpResponse, ReadFileRequest, ReadFileResponse,
    TreeResponse, WriteFileRequest,
};
use crate::server::tree;

/// POST /files: the caller's whole workspace tree
pub async fn list_tree(
    State(ctx): State<AppContext>,
    workspace: UserWorkspace,
) -> Result<Json<TreeResponse>, AppError> {
    debug!("[{}] listing {:?}", workspace.user, workspace.root);

    let options = ctx.config.tree_options();
    let root = workspace.root;
    // Run the walk in a blocking task to avoid blocking async runtime
    let node = tokio::task::spawn_blocking(move || tree::build_tree(&root, &options)).await??;

    Ok(Json(TreeResponse {
        success: true,
        root: node,
    }))
}

/// POST /file: open a file in the editor
pub async fn read_file(
    State(ctx): State<AppContext>,
    workspace: UserWorkspace,
    ValidatedJson(req): ValidatedJson<ReadFileRequest>,
) -> Result<Json<ReadFileResponse>, AppError> {
    debug!("[{}] reading {}", workspace.user, req.path);

    let path = PathBuf::from(req.path);
    let images = ctx.config.public_images();
    let outcome =
        tokio::task::spawn_blocking(move || file_api::read_file(&path, &images)).await??;

    Ok(Json(ReadFileResponse::from(outcome)))
}

/// POST /file/save
pub async fn write_file(
    workspace: UserWorkspace,
    ValidatedJson(req): ValidatedJson<WriteFileRequest>,
) -> Result<Json<OpResponse>, AppError> {
    let path = PathBuf::from(req.path);
    let content = req.content;
    let size = tokio::task::spawn_blocking({
        let path = path.clone();
        move || file_api::write_file(&path, &content)
    })
    .await??;

    debug!("[{}] saved {:?} ({} bytes)", workspace.user, path, size);
    Ok(Json(OpResponse::ok()))
}

/// POST /file/new
pub async fn create_entry(
    workspace: UserWorkspace,
    ValidatedJson(req): ValidatedJson<CreateEntryRequest>,
) -> Result<Json<OpResponse>, AppError> {
    info!(
        "[{}] creating {} {}",
        workspace.user,
        req.kind.as_str(),
        req.path
    );

    let path = PathBuf::from(req.path);
    let kind = req.kind;
    tokio::task::spawn_blocking(move || file_api::create_entry(&path, kind)).await??;

    Ok(Json(OpResponse::ok()))
}

/// POST /file/remove
pub async fn delete_entry(
    workspace: UserWorkspace,
    ValidatedJson(req): ValidatedJson<DeleteEntryRequest>,
) -> Result<Json<OpResponse>, AppError> {
    info!("[{}] removing {}", workspace.user, req.path);

    let path = PathBuf::from(req.path);
    tokio::task::spawn_blocking(move || file_api::remove_entry(&path)).await??;

    Ok(Json(OpResponse::ok()))
}

/// Map a URL tail below the public prefix onto `user_workspaces`.
///
/// Only plain name segments are accepted.
fn published_file(user_workspaces: &Path, tail: &str) -> Option<PathBuf> {
    let tail = Path::new(tail);
    let mut components = tail.components().peekable();
    components.peek()?;
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(user_workspaces.join(tail))
}

/// GET {public_prefix}/*path: an image from the caller's own workspace
pub async fn serve_image(
    State(ctx): State<AppContext>,
    workspace: UserWorkspace,
    UrlPath(tail): UrlPath<String>,
) -> Result<Response, AppError> {
    let forbidden = || {
        warn!("[{}] refusing to serve {}", workspace.user, tail);
        AppError::Forbidden(format!("{} is not an image in your workspace", tail))
    };

    let path =
        published_file(&ctx.config.workspace.user_workspaces, &tail).ok_or_else(forbidden)?;
    if !classify::is_image_path(&path) {
        return Err(forbidden());
    }

    // 解析符号链接后再比较，防止链接指向其他用户目录
    let resolved = tokio::fs::canonicalize(&path)
        .await
        .map_err(|e| FileApiError::from_io(&path, e))?;
    let root = tokio::fs::canonicalize(&workspace.root)
        .await
        .map_err(|e| FileApiError::from_io(&workspace.root, e))?;
    if !resolved.starts_with(&root) {
        return Err(forbidden());
    }

    let bytes = tokio::fs::read(&resolved)
        .await
        .map_err(|e| FileApiError::from_io(&path, e))?;
    debug!("[{}] serving {:?} ({} bytes)", workspace.user, path, bytes.len());

    Ok(([(header::CONTENT_TYPE, classify::image_mime(&path))], bytes).into_response())
}
