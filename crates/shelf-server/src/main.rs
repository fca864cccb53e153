//! # AppShelf Server
//!
//! Lists downloadable application bundles found on disk and serves the
//! newest artifact per platform through a guarded download endpoint.

mod api;
mod mime;
mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Shared application state available to all handlers.
pub struct AppState {
    pub config: shelf_common::AppConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting AppShelf server...");

    // Load configuration
    let config = shelf_common::AppConfig::load().expect("Failed to load configuration");
    tracing::info!(root = %config.downloads.root.display(), "Serving downloads");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
    });

    // Build router. The security-header layer wraps every route, including
    // the static /downloads tree.
    let app = Router::new()
        .merge(api::router(state.clone()))
        .nest_service("/downloads", ServeDir::new(&config.downloads.root))
        .layer(axum::middleware::from_fn(api::middleware::security_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
