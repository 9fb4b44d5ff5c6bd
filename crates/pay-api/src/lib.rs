//! # pay-api
//!
//! HTTP surface for paydesk.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - The gateway callback endpoint (configurable route, literal
//!   `success`/`fail` bodies)
//! - Application state wiring and environment configuration
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `{callback_route}` | Gateway payment callback |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_router, normalize_callback_route};
pub use state::{AppConfig, AppState, LogChannel};
