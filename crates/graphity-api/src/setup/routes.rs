//! Route configuration and setup

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{CREATE_PATH, HEALTH_PATH};
use crate::handlers;
use crate::state::AppState;

/// Multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn setup_routes(state: AppState) -> Router {
    let body_limit = state
        .upload
        .max_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route(CREATE_PATH, post(handlers::create::create))
        .route(HEALTH_PATH, get(handlers::health::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
