//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::picker_page))
        .route("/api/records", get(handlers::api_records))
        .route("/merge", post(handlers::merge_files))
        .route("/download/*name", get(handlers::serve_download))
        .route("/static/style.css", get(handlers::serve_css))
        .route("/static/picker.js", get(handlers::serve_js))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
