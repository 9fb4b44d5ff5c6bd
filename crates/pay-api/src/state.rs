//! # Application State
//!
//! Shared state for the axum application: the reconciliation engine plus
//! the server-level configuration loaded from the environment.

use async_trait::async_trait;
use pay_core::{
    is_valid_owner_id, DeliveryChannel, MemoryOrderStore, Notifier, PayResult, SharedGateway,
    SharedOrderStore,
};
use pay_epay::{EpayClient, EpayConfig};
use pay_recon::{ReconConfig, ReconEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Administrator account id (the chat surface gates commands on this)
    pub admin_id: String,
    /// Callback route; normalized to begin and end with `/`
    pub callback_route: String,
    /// Raises the default log filter to debug
    pub debug_mode: bool,
    /// Active-polling fallback switch
    pub polling_enabled: bool,
    /// Delay before a new order's first poll cycle
    pub initial_wait: Duration,
    /// Delay between poll cycles
    pub poll_interval: Duration,
    /// Orders older than this are no longer polled
    pub expiration: Duration,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("PAYDESK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PAYDESK_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            admin_id: std::env::var("PAYDESK_ADMIN_ID").unwrap_or_default(),
            callback_route: std::env::var("PAYDESK_CALLBACK_ROUTE")
                .unwrap_or_else(|_| "/paydesk/callback/".to_string()),
            debug_mode: env_flag("PAYDESK_DEBUG"),
            polling_enabled: env_flag("PAYDESK_POLLING_ENABLED"),
            initial_wait: env_secs("PAYDESK_INITIAL_WAIT_SECS", 30),
            poll_interval: env_secs("PAYDESK_POLL_INTERVAL_SECS", 30),
            expiration: env_mins("PAYDESK_ORDER_EXPIRATION_MINS", 30),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Polling parameters for the engine (clamped there)
    pub fn recon_config(&self) -> ReconConfig {
        ReconConfig {
            polling_enabled: self.polling_enabled,
            initial_wait: self.initial_wait,
            poll_interval: self.poll_interval,
            expiration: self.expiration,
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

fn env_mins(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        60 * std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reconciliation engine
    pub engine: Arc<ReconEngine>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the production state: env config, epay client, in-memory
    /// store, and a logging delivery channel until real bot connections
    /// are registered.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        if !is_valid_owner_id(&config.admin_id) {
            anyhow::bail!("PAYDESK_ADMIN_ID must be a 5-12 digit account id");
        }

        let epay = EpayConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load gateway config: {e}"))?;
        let gateway: SharedGateway = Arc::new(EpayClient::new(epay.clone()));
        let store: SharedOrderStore = Arc::new(MemoryOrderStore::new());
        let notifier = Notifier::new().with_channel(Arc::new(LogChannel));

        let engine = ReconEngine::new(store, gateway, notifier, epay, config.recon_config());
        Ok(Self { engine, config })
    }

    /// Assemble state from prebuilt parts (tests, embedders)
    pub fn with_engine(engine: Arc<ReconEngine>, config: AppConfig) -> Self {
        Self { engine, config }
    }
}

/// Delivery channel of last resort: writes the notice to the log and
/// reports success, so reconciliation keeps its at-least-once behavior
/// even before any bot connection is registered.
pub struct LogChannel;

#[async_trait]
impl DeliveryChannel for LogChannel {
    fn label(&self) -> String {
        "log".to_string()
    }

    async fn send_to_group(&self, channel_id: &str, text: &str) -> PayResult<()> {
        info!(channel_id, %text, "notice (group)");
        Ok(())
    }

    async fn send_private(&self, user_id: &str, text: &str) -> PayResult<()> {
        info!(user_id, %text, "notice (private)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("PAYDESK_HOST");
        std::env::remove_var("PAYDESK_PORT");
        std::env::remove_var("PAYDESK_POLLING_ENABLED");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.callback_route, "/paydesk/callback/");
        assert!(!config.polling_enabled);
        assert_eq!(config.initial_wait, Duration::from_secs(30));
        assert_eq!(config.expiration, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            admin_id: "10001".to_string(),
            callback_route: "/paydesk/callback/".to_string(),
            debug_mode: false,
            polling_enabled: false,
            initial_wait: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            expiration: Duration::from_secs(1800),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
