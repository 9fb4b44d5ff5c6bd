//! # Request Handlers
//!
//! Axum request handlers. The callback handler is deliberately thin: the
//! engine decides, the handler renders the decision verbatim.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paydesk",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Gateway payment callback.
///
/// Accepts the flat query parameter set the gateway pushes and answers
/// with exactly `success` or `fail` — the gateway retries anything else.
#[instrument(skip(state, params))]
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let outcome = state.engine.handle_callback(&params).await;
    info!(?outcome, "callback processed");

    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, outcome.body())
}
