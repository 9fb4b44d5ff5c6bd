//! # Routes
//!
//! Axum router configuration. The callback route comes from configuration
//! and is normalized so operators can write it with or without the
//! surrounding separators.

use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Normalize a configured callback route to begin and end with `/`.
pub fn normalize_callback_route(route: &str) -> String {
    let trimmed = route.trim();
    let mut normalized = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(trimmed);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Create the main application router
///
/// Routes:
/// - GET `/health` — health check
/// - GET `{callback_route}` — gateway payment callback (configurable,
///   default `/paydesk/callback/`)
pub fn create_router(state: AppState) -> Router {
    let callback_route = normalize_callback_route(&state.config.callback_route);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route(&callback_route, get(handlers::payment_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
