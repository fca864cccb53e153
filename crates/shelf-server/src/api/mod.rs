//! API routes module.

mod catalog;
mod download;
mod health;
pub mod middleware;

use crate::AppState;
use axum::Router;
use std::sync::Arc;

/// Build the router with all sub-routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(catalog::router(state.clone()))
        .nest("/api/download", download::router(state))
        .merge(health::router())
}
