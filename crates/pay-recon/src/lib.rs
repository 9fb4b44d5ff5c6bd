//! # pay-recon
//!
//! Dual-path order reconciliation for paydesk.
//!
//! An order's paid status can arrive two ways: the gateway pushes a signed
//! callback, or — on deployments without inbound network exposure — the
//! active-polling fallback asks the gateway itself. Both paths converge on
//! one idempotent mark-paid-and-notify step, so however the race between
//! them falls, the order settles once and the originating conversation is
//! notified once.
//!
//! This crate provides:
//! - `ReconEngine` — callback processing, settlement, order placement,
//!   forced manual query, refund, and owner assignment
//! - `PollScheduler` — the per-order registration table behind active
//!   polling, with a deterministic shutdown
//! - `ReconConfig` — polling timing parameters, clamped to their bounds
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_recon::{ReconConfig, ReconEngine};
//!
//! let engine = ReconEngine::new(store, gateway, notifier, epay_config, ReconConfig::default());
//!
//! // callback path (HTTP layer renders the outcome verbatim)
//! let outcome = engine.handle_callback(&params).await;
//! assert_eq!(outcome.body(), "success");
//!
//! // operator surface
//! let placed = engine.place_order("100001234", origin, "10.00", None).await?;
//! let report = engine.force_query(&placed.order_no).await?;
//! ```

pub mod config;
pub mod engine;
pub mod poller;

// Re-exports
pub use config::{ReconConfig, MAX_POLL_CYCLES};
pub use engine::{CallbackOutcome, OrderReport, PlacedOrder, ReconEngine, RefundReceipt};
pub use poller::PollScheduler;
