//! # Payment Error Types
//!
//! Typed error handling for the paydesk reconciliation core.
//! All fallible operations return `Result<T, PayError>`.

use crate::order::OrderStatus;
use thiserror::Error;

/// Core error type for all reconciliation operations
#[derive(Debug, Error)]
pub enum PayError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid request data (bad amount, unknown method, malformed id)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No order record for the given id
    #[error("Order not found: {order_no}")]
    OrderNotFound { order_no: String },

    /// Declared amount disagrees with the stored order amount
    #[error("Amount mismatch: stored {stored}, declared {declared}")]
    AmountMismatch { stored: String, declared: String },

    /// Callback signature missing or digest mismatch
    #[error("Callback signature verification failed")]
    BadSignature,

    /// Status write that does not follow the order state machine
    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Refund requested for an order that is not paid
    #[error("Order {order_no} is {status}, only paid orders can be refunded")]
    NotRefundable {
        order_no: String,
        status: OrderStatus,
    },

    /// Gateway answered with a non-success code and message
    #[error("Gateway error [code {code}]: {message}")]
    Gateway { code: String, message: String },

    /// Network/HTTP error talking to the gateway
    #[error("Network error: {0}")]
    Network(String),

    /// Order store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Every delivery channel failed
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PayError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// Gateway errors carrying an explicit failure code are terminal and
    /// never retried silently; transport and store failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PayError::Network(_) | PayError::Store(_))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PayError::Config(_) => 500,
            PayError::InvalidRequest(_) => 400,
            PayError::OrderNotFound { .. } => 404,
            PayError::AmountMismatch { .. } => 400,
            PayError::BadSignature => 400,
            PayError::InvalidTransition { .. } => 409,
            PayError::NotRefundable { .. } => 409,
            PayError::Gateway { .. } => 502,
            PayError::Network(_) => 503,
            PayError::Store(_) => 500,
            PayError::NotifyFailed(_) => 502,
            PayError::Serialization(_) => 500,
            PayError::Internal(_) => 500,
        }
    }
}

/// Result type alias for reconciliation operations
pub type PayResult<T> = Result<T, PayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PayError::Network("timeout".into()).is_retryable());
        assert!(PayError::Store("lock poisoned".into()).is_retryable());
        assert!(!PayError::BadSignature.is_retryable());
        assert!(!PayError::Gateway {
            code: "0".into(),
            message: "merchant disabled".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PayError::BadSignature.status_code(), 400);
        assert_eq!(
            PayError::OrderNotFound {
                order_no: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(
            PayError::AmountMismatch {
                stored: "5.00".into(),
                declared: "7.00".into()
            }
            .status_code(),
            400
        );
        assert_eq!(PayError::Network("refused".into()).status_code(), 503);
    }
}
