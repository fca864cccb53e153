//! Catalog endpoint — lists every app with at least one artifact.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::services::catalog::{self, AppEntry};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(list_apps)).with_state(state)
}

/// Rebuilt from the filesystem on every request — no caching, so a freshly
/// dropped artifact shows up on the next page load.
async fn list_apps(State(state): State<Arc<AppState>>) -> Json<Vec<AppEntry>> {
    let apps = catalog::build_catalog(&state.config.downloads.root).await;
    tracing::debug!(apps = apps.len(), "Catalog built");
    Json(apps)
}
