//! # Payment Gateway Trait
//!
//! Contract for the external payment API: create, query, refund. Loosely
//! typed wire fields (`code`, `status` arriving as number or string) are
//! normalized by the implementation at this boundary, so downstream logic
//! only ever compares the closed enums defined here.

use crate::error::PayResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Normalized order state as reported by the gateway query endpoint.
///
/// The wire protocol has exactly one success value; everything else is an
/// order still awaiting payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOrderState {
    Paid,
    Pending,
}

impl GatewayOrderState {
    pub fn is_paid(self) -> bool {
        matches!(self, GatewayOrderState::Paid)
    }
}

/// Result of a create-order call
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    /// Order id assigned by the gateway
    pub gateway_no: String,
    /// Hosted payment page, when the gateway offers one
    pub pay_url: Option<String>,
    /// QR code payload string
    pub qr_code: Option<String>,
    /// Rendered QR image URL
    pub qr_image: Option<String>,
}

/// Result of a query-order call
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub gateway_no: String,
    pub order_no: String,
    pub amount: String,
    pub state: GatewayOrderState,
    /// Gateway-side creation timestamp, verbatim
    pub created_time: Option<String>,
    /// Gateway-side completion timestamp, verbatim
    pub completed_time: Option<String>,
    pub buyer: Option<String>,
}

/// Contract for the external payment API.
///
/// Implementations wrap every transport or protocol failure into
/// `PayError`; callers never see a raw HTTP error.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` (two-decimal wire format) payable via
    /// `method`, keyed by the business order id.
    async fn create_order(
        &self,
        order_no: &str,
        amount: &str,
        method: &str,
    ) -> PayResult<CreatedOrder>;

    /// Query current order state by business order id.
    async fn query_order(&self, order_no: &str) -> PayResult<GatewayOrder>;

    /// Refund a paid order in full.
    async fn refund(&self, order_no: &str, amount: &str) -> PayResult<()>;
}

/// Type alias for a shared gateway handle (dynamic dispatch)
pub type SharedGateway = Arc<dyn PaymentGateway>;
