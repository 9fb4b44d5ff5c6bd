//! # pay-epay
//!
//! Epay-protocol gateway integration for paydesk.
//!
//! This crate provides:
//!
//! 1. **Signature codec** — the canonicalize-sort-digest scheme the
//!    protocol uses for outbound requests and inbound callbacks. One pure
//!    implementation serves both directions.
//! 2. **EpayClient** — create / query / refund calls over reqwest,
//!    normalizing the protocol's loosely-typed `code` / `status` fields at
//!    the boundary.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_epay::{EpayClient, EpayConfig};
//! use pay_core::PaymentGateway;
//!
//! let client = EpayClient::from_env()?;
//!
//! let created = client.create_order("1700000000000123", "10.00", "alipay").await?;
//! println!("pay at {:?}", created.pay_url);
//!
//! let current = client.query_order("1700000000000123").await?;
//! if current.state.is_paid() {
//!     // settle
//! }
//! ```

pub mod client;
pub mod config;
pub mod sign;

// Re-exports
pub use client::EpayClient;
pub use config::EpayConfig;
pub use sign::{sign, verify};
