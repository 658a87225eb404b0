//! Router configuration for the web server.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/entities", get(handlers::list_entities))
        .route("/shard-keys", get(handlers::list_shard_keys))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
