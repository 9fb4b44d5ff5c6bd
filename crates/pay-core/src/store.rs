//! # Order Store
//!
//! Keyed-record-store contract for order persistence, plus an in-memory
//! adapter. The store is the single choke point for status writes: every
//! mutation is validated against the order status machine before it lands.

use crate::error::{PayError, PayResult};
use crate::order::{Order, OrderStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistence contract for order records.
///
/// Implementations must keep exactly one record per business order id and
/// must make `mark_paid` atomic with respect to concurrent settlement
/// attempts; the reconciliation engine's no-double-notify guarantee rests
/// on that.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new record. Rejects a duplicate business order id.
    async fn insert(&self, order: Order) -> PayResult<()>;

    /// Look up by business order id.
    async fn find_by_order_no(&self, order_no: &str) -> PayResult<Option<Order>>;

    /// Look up by gateway-assigned order id.
    async fn find_by_gateway_no(&self, gateway_no: &str) -> PayResult<Option<Order>>;

    /// Atomically transition `Pending -> Paid`.
    ///
    /// Returns `Ok(true)` when this call performed the transition,
    /// `Ok(false)` when the order was already paid, and
    /// `PayError::InvalidTransition` for terminal states.
    async fn mark_paid(&self, order_no: &str) -> PayResult<bool>;

    /// Validated status write for the remaining transitions
    /// (`Pending -> Failed`, `Paid -> Refunded`).
    async fn update_status(&self, order_no: &str, status: OrderStatus) -> PayResult<()>;

    /// Set or replace the assigned owner.
    async fn update_owner(&self, order_no: &str, owner: &str) -> PayResult<()>;

    /// Orders placed by a requester, most recent first, at most `limit`.
    async fn list_by_requester(&self, requester: &str, limit: usize) -> PayResult<Vec<Order>>;

    /// Orders assigned to an owner, most recent first.
    async fn list_by_owner(&self, owner: &str) -> PayResult<Vec<Order>>;
}

/// Type alias for a shared store handle (dynamic dispatch)
pub type SharedOrderStore = Arc<dyn OrderStore>;

/// A thread-safe in-memory order store.
///
/// Keyed by business order id over `RwLock<HashMap>`. The default adapter
/// for tests and single-process deployments; durable storage is an external
/// concern behind the same trait.
#[derive(Default, Clone)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> PayResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_no) {
            return Err(PayError::Internal(format!(
                "duplicate business order id: {}",
                order.order_no
            )));
        }
        orders.insert(order.order_no.clone(), order);
        Ok(())
    }

    async fn find_by_order_no(&self, order_no: &str) -> PayResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_no).cloned())
    }

    async fn find_by_gateway_no(&self, gateway_no: &str) -> PayResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.gateway_no == gateway_no)
            .cloned())
    }

    async fn mark_paid(&self, order_no: &str) -> PayResult<bool> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_no).ok_or_else(|| PayError::OrderNotFound {
            order_no: order_no.to_string(),
        })?;
        match order.status {
            OrderStatus::Paid => Ok(false),
            OrderStatus::Pending => {
                order.status = OrderStatus::Paid;
                order.updated_at = Utc::now();
                Ok(true)
            }
            from => Err(PayError::InvalidTransition {
                from,
                to: OrderStatus::Paid,
            }),
        }
    }

    async fn update_status(&self, order_no: &str, status: OrderStatus) -> PayResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_no).ok_or_else(|| PayError::OrderNotFound {
            order_no: order_no.to_string(),
        })?;
        if !order.status.can_transition_to(status) {
            return Err(PayError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_owner(&self, order_no: &str, owner: &str) -> PayResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_no).ok_or_else(|| PayError::OrderNotFound {
            order_no: order_no.to_string(),
        })?;
        order.owner = Some(owner.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_requester(&self, requester: &str, limit: usize) -> PayResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|o| o.requester == requester)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn list_by_owner(&self, owner: &str) -> PayResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|o| o.owner.as_deref() == Some(owner))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderOrigin;

    fn order(order_no: &str, requester: &str) -> Order {
        Order::new(
            order_no,
            format!("gw-{order_no}"),
            requester,
            OrderOrigin::Private {
                user_id: requester.to_string(),
            },
            "10.00",
            "alipay",
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookups() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();

        let by_order = store
            .find_by_order_no("1700000000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_order.status, OrderStatus::Pending);

        let by_gateway = store
            .find_by_gateway_no("gw-1700000000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_gateway.order_no, "1700000000000001");

        assert!(store.find_by_order_no("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();
        assert!(store.insert(order("1700000000000001", "10002")).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();

        assert!(store.mark_paid("1700000000000001").await.unwrap());
        assert!(!store.mark_paid("1700000000000001").await.unwrap());

        let stored = store
            .find_by_order_no("1700000000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_mark_paid_rejects_terminal_states() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();
        store
            .update_status("1700000000000001", OrderStatus::Failed)
            .await
            .unwrap();

        assert!(matches!(
            store.mark_paid("1700000000000001").await,
            Err(PayError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_status_enforces_machine() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();

        // pending -> refunded is not a legal edge
        assert!(matches!(
            store
                .update_status("1700000000000001", OrderStatus::Refunded)
                .await,
            Err(PayError::InvalidTransition { .. })
        ));

        store.mark_paid("1700000000000001").await.unwrap();
        store
            .update_status("1700000000000001", OrderStatus::Refunded)
            .await
            .unwrap();

        let stored = store
            .find_by_order_no("1700000000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_owner_assignment_and_listing() {
        let store = MemoryOrderStore::new();
        store.insert(order("1700000000000001", "10001")).await.unwrap();
        store.insert(order("1700000000000002", "10001")).await.unwrap();

        store
            .update_owner("1700000000000002", "20002")
            .await
            .unwrap();

        let owned = store.list_by_owner("20002").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].order_no, "1700000000000002");

        let placed = store.list_by_requester("10001", 10).await.unwrap();
        assert_eq!(placed.len(), 2);

        let limited = store.list_by_requester("10001", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
