//! # pay-core
//!
//! Core types and trait seams for the paydesk reconciliation engine.
//!
//! This crate provides:
//! - `Order`, `OrderStatus`, and `OrderOrigin` for the order entity
//! - `OrderStore` trait and the in-memory adapter
//! - `PaymentGateway` trait with normalized reply types
//! - `DeliveryChannel` trait and the `Notifier` fan-out
//! - `PaymentMethods` registry for method code/display resolution
//! - `PayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{generate_order_no, MemoryOrderStore, Order, OrderOrigin, OrderStore};
//!
//! let store = MemoryOrderStore::new();
//! let order_no = generate_order_no("100001234");
//!
//! let order = Order::new(
//!     &order_no,
//!     "2024123112345",
//!     "100001234",
//!     OrderOrigin::Private { user_id: "100001234".into() },
//!     "10.00",
//!     "alipay",
//! );
//! store.insert(order).await?;
//!
//! // settlement paths converge on the atomic transition
//! let first = store.mark_paid(&order_no).await?; // true
//! let again = store.mark_paid(&order_no).await?; // false, no second notify
//! ```

pub mod error;
pub mod gateway;
pub mod method;
pub mod notify;
pub mod order;
pub mod store;

// Re-exports for convenience
pub use error::{PayError, PayResult};
pub use gateway::{CreatedOrder, GatewayOrder, GatewayOrderState, PaymentGateway, SharedGateway};
pub use method::PaymentMethods;
pub use notify::{DeliveryChannel, Notifier, SharedChannel};
pub use order::{
    amounts_match, format_amount, generate_order_no, is_valid_order_no, is_valid_owner_id,
    parse_amount, Order, OrderOrigin, OrderStatus,
};
pub use store::{MemoryOrderStore, OrderStore, SharedOrderStore};
