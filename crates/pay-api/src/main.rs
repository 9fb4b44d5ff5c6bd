//! # PayDesk
//!
//! Order reconciliation service for chat-bot payment flows.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYDESK_ADMIN_ID=100001234
//! export EPAY_API_URL=https://pay.example.com
//! export EPAY_MERCHANT_PID=1001
//! export EPAY_MERCHANT_KEY=...
//!
//! # Run the server
//! paydesk
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // State first: the debug flag decides the default log filter.
    let state = AppState::new()?;

    let default_level = if state.config.debug_mode {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let addr = state.config.socket_addr()?;

    info!("Callback route: {}", state.config.callback_route);
    info!(
        "Active polling: {}",
        if state.config.polling_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    if state.config.polling_enabled {
        info!(
            "Polling timing: initial {:?}, interval {:?}, expiration {:?}",
            state.config.initial_wait, state.config.poll_interval, state.config.expiration
        );
    }

    let engine = state.engine.clone();
    let app = routes::create_router(state);

    info!("🚀 PayDesk starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel pending poll timers so none wake into a torn-down process.
    engine.shutdown().await;
    info!("PayDesk stopped");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
