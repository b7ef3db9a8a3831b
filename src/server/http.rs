use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::server::context::AppContext;
use crate::server::handlers;
use crate::server::protocol::{HealthResponse, PROTOCOL_VERSION};
use crate::workspace::DirWorkspaceResolver;

/// Build the router: file routes, health check, and the image route that
/// serves paths handed out by `/file`.
pub fn build_router(ctx: AppContext) -> Router {
    // validate() 保证去掉结尾 '/' 后非空
    let images = format!(
        "{}/*path",
        ctx.config.workspace.public_prefix.trim_end_matches('/')
    );

    Router::new()
        .route("/health", get(health))
        .route("/files", post(handlers::file::list_tree))
        .route("/file", post(handlers::file::read_file))
        .route("/file/save", post(handlers::file::write_file))
        .route("/file/new", post(handlers::file::create_entry))
        .route("/file/remove", post(handlers::file::delete_entry))
        .route(&images, get(handlers::file::serve_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        version: PROTOCOL_VERSION,
    })
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let addr = config.bind_addr();
    info!(
        "Serving workspaces from {:?} (public prefix {})",
        config.workspace.user_workspaces, config.workspace.public_prefix
    );

    let resolver = Arc::new(DirWorkspaceResolver::from_config(&config.workspace));
    let app = build_router(AppContext::new(config, resolver));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{} (protocol v{})", addr, PROTOCOL_VERSION);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
