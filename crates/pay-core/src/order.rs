//! # Order Types
//!
//! The central order entity, its closed status machine, and the helpers
//! for business order ids and fixed-point amounts.

use crate::error::{PayError, PayResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest amount the gateway accepts for a single order.
const MAX_AMOUNT: u32 = 99_999;

/// Where the order-placing conversation happened.
///
/// Group orders are notified back into the channel; private orders go
/// straight to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderOrigin {
    Group {
        guild_id: String,
        channel_id: String,
    },
    Private {
        user_id: String,
    },
}

/// Payment state of an order.
///
/// Transitions are one-directional: `Pending -> Paid`, `Pending -> Failed`,
/// `Paid -> Refunded`. There is no path back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment confirmation
    Pending,
    /// Payment confirmed by the gateway
    Paid,
    /// Order failed before payment
    Failed,
    /// Paid order refunded to the buyer
    Refunded,
}

impl OrderStatus {
    /// Whether the status machine allows moving to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order placed against the payment gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Business order id, the primary lookup key
    pub order_no: String,

    /// Order id assigned by the gateway
    pub gateway_no: String,

    /// Identity of the user who placed the order
    pub requester: String,

    /// Conversation to notify on completion
    pub origin: OrderOrigin,

    /// Fixed-point amount, exactly two decimals, immutable after creation
    pub amount: String,

    /// Payment method code chosen at creation time
    pub method: String,

    /// Current status
    #[serde(default)]
    pub status: OrderStatus,

    /// Assigned owner, settable after creation independently of the requester
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order record at placement time.
    pub fn new(
        order_no: impl Into<String>,
        gateway_no: impl Into<String>,
        requester: impl Into<String>,
        origin: OrderOrigin,
        amount: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_no: order_no.into(),
            gateway_no: gateway_no.into(),
            requester: requester.into(),
            origin,
            amount: amount.into(),
            method: method.into(),
            status: OrderStatus::Pending,
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Age of the order measured from creation time.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

/// Generate a business order id: millisecond timestamp, the last four
/// characters of the requester id, four random digits.
///
/// Uniqueness is optimistic; the store rejects a duplicate id on insert.
pub fn generate_order_no(requester: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: String = requester
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let random = rand::thread_rng().gen_range(0..10_000u32);
    format!("{timestamp}{suffix}{random:04}")
}

/// Order-number format check: 10 to 25 digits, covering both business ids
/// and gateway-assigned ids.
pub fn is_valid_order_no(order_no: &str) -> bool {
    (10..=25).contains(&order_no.len()) && order_no.bytes().all(|b| b.is_ascii_digit())
}

/// Owner ids are bare numeric account ids, 5 to 12 digits.
pub fn is_valid_owner_id(owner: &str) -> bool {
    (5..=12).contains(&owner.len()) && owner.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a user-supplied amount, enforcing the gateway bounds
/// (positive, at most 99999).
pub fn parse_amount(raw: &str) -> PayResult<Decimal> {
    let amount = Decimal::from_str(raw.trim())
        .map_err(|_| PayError::InvalidRequest(format!("not a valid amount: {raw}")))?;
    if amount <= Decimal::ZERO || amount > Decimal::from(MAX_AMOUNT) {
        return Err(PayError::InvalidRequest(format!(
            "amount out of range (0, {MAX_AMOUNT}]: {raw}"
        )));
    }
    Ok(amount)
}

/// Render an amount in the gateway wire format: two decimals, no separators.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Compare two wire-format amounts as decimal values, not as strings,
/// so `"10.0"` and `"10.00"` agree.
pub fn amounts_match(a: &str, b: &str) -> bool {
    match (Decimal::from_str(a.trim()), Decimal::from_str(b.trim())) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
