//! # Reconciliation Engine
//!
//! Owns the order state transitions. Two independent paths learn that an
//! order was paid — the gateway's inbound callback and the active-polling
//! fallback — and both converge on one idempotent mark-paid-and-notify
//! step, so a race between them settles the order once and notifies once.

use crate::config::{ReconConfig, MAX_POLL_CYCLES};
use crate::poller::PollScheduler;
use chrono::Utc;
use pay_core::{
    amounts_match, format_amount, generate_order_no, is_valid_owner_id, parse_amount, Notifier,
    Order, OrderOrigin, OrderStatus, PayError, PayResult, SharedGateway, SharedOrderStore,
};
use pay_epay::{sign, EpayConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// The one trade status value that settles an order.
const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

/// Decision for an inbound callback, mapping 1:1 onto the HTTP reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Order transitioned to paid and the notification was dispatched
    Settled,
    /// Duplicate success callback; acknowledged without a second notification
    AlreadyPaid,
    /// Recognized event whose trade status is not a success; acknowledged so
    /// the gateway stops retrying, nothing mutated
    NotActionable,
    /// Signature missing or digest mismatch; nothing mutated
    BadSignature,
    /// No local order for the declared business order id
    UnknownOrder,
    /// Declared amount disagrees with the stored order
    AmountMismatch,
    /// Unexpected internal failure while processing
    Internal,
}

impl CallbackOutcome {
    /// HTTP status for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            CallbackOutcome::Settled
            | CallbackOutcome::AlreadyPaid
            | CallbackOutcome::NotActionable => 200,
            CallbackOutcome::BadSignature | CallbackOutcome::AmountMismatch => 400,
            CallbackOutcome::UnknownOrder => 404,
            CallbackOutcome::Internal => 500,
        }
    }

    /// The literal response body the gateway protocol expects
    pub fn body(&self) -> &'static str {
        match self {
            CallbackOutcome::Settled
            | CallbackOutcome::AlreadyPaid
            | CallbackOutcome::NotActionable => "success",
            _ => "fail",
        }
    }
}

/// Result of placing an order: what the operator needs to collect payment
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_no: String,
    pub gateway_no: String,
    pub amount: String,
    pub method: String,
    pub method_display: String,
    pub pay_url: Option<String>,
    pub qr_code: Option<String>,
    pub qr_image: Option<String>,
}

/// Snapshot returned by a forced manual query
#[derive(Debug, Clone)]
pub struct OrderReport {
    pub order_no: String,
    pub gateway_no: String,
    pub amount: String,
    pub method_display: String,
    pub status: OrderStatus,
    pub owner: Option<String>,
    pub created_time: Option<String>,
    pub completed_time: Option<String>,
}

/// Result of a refund operation
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub order_no: String,
    pub amount: String,
}

/// Outcome of one poll cycle
enum PollStep {
    /// Stop polling this order
    Done,
    /// Try again after the configured interval
    Retry,
}

/// The reconciliation engine: callback processing, active polling, and the
/// operator-facing order operations.
pub struct ReconEngine {
    store: SharedOrderStore,
    gateway: SharedGateway,
    notifier: Notifier,
    epay: EpayConfig,
    recon: ReconConfig,
    scheduler: PollScheduler,
}

impl ReconEngine {
    pub fn new(
        store: SharedOrderStore,
        gateway: SharedGateway,
        notifier: Notifier,
        epay: EpayConfig,
        recon: ReconConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            gateway,
            notifier,
            epay,
            recon: recon.sanitized(),
            scheduler: PollScheduler::new(),
        })
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Cancel every pending poll task. Call on deactivation so no timer
    /// wakes up into a torn-down process.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    // ------------------------------------------------------------------
    // Order placement
    // ------------------------------------------------------------------

    /// Create an order against the gateway and persist the pending record.
    ///
    /// When active polling is enabled, the new order is watched
    /// immediately. Gateway and store failures surface to the caller; there
    /// is no retry on this path.
    #[instrument(skip_all, fields(requester = %requester))]
    pub async fn place_order(
        self: &Arc<Self>,
        requester: &str,
        origin: OrderOrigin,
        raw_amount: &str,
        method_input: Option<&str>,
    ) -> PayResult<PlacedOrder> {
        let amount = format_amount(parse_amount(raw_amount)?);

        let method = match method_input {
            Some(input) => self.epay.methods.resolve(input).ok_or_else(|| {
                PayError::InvalidRequest(format!(
                    "unsupported payment method {input:?}; available: {}",
                    self.epay.methods.summary()
                ))
            })?,
            None => self
                .epay
                .methods
                .resolve(&self.epay.default_method)
                .ok_or_else(|| {
                    PayError::Config(format!(
                        "default payment method {} is not configured",
                        self.epay.default_method
                    ))
                })?,
        }
        .to_string();

        let order_no = generate_order_no(requester);
        debug!(%order_no, %amount, %method, "creating gateway order");

        let created = self
            .gateway
            .create_order(&order_no, &amount, &method)
            .await?;

        let order = Order::new(
            &order_no,
            &created.gateway_no,
            requester,
            origin,
            &amount,
            &method,
        );
        self.store.insert(order.clone()).await?;
        info!(%order_no, gateway_no = %created.gateway_no, "order placed");

        if self.recon.polling_enabled {
            self.watch(&order).await;
        }

        Ok(PlacedOrder {
            order_no,
            gateway_no: created.gateway_no,
            amount: order.amount,
            method_display: self.epay.methods.display(&order.method).to_string(),
            method: order.method,
            pay_url: created.pay_url,
            qr_code: created.qr_code,
            qr_image: created.qr_image,
        })
    }

    // ------------------------------------------------------------------
    // Callback path
    // ------------------------------------------------------------------

    /// Process an inbound gateway callback.
    ///
    /// Never panics or errors out: every condition collapses into a
    /// [`CallbackOutcome`] that the HTTP layer renders verbatim.
    pub async fn handle_callback(&self, params: &HashMap<String, String>) -> CallbackOutcome {
        match self.try_handle_callback(params).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "callback processing failed");
                CallbackOutcome::Internal
            }
        }
    }

    async fn try_handle_callback(
        &self,
        params: &HashMap<String, String>,
    ) -> PayResult<CallbackOutcome> {
        debug!(?params, "received payment callback");

        // Forged-callback defense: nothing is trusted before this check.
        if !sign::verify(params, &self.epay.merchant_key) {
            error!("callback signature verification failed");
            return Ok(CallbackOutcome::BadSignature);
        }

        let order_no = params
            .get("out_trade_no")
            .map(String::as_str)
            .unwrap_or_default();
        let Some(order) = self.store.find_by_order_no(order_no).await? else {
            error!(order_no, "callback for unknown order");
            return Ok(CallbackOutcome::UnknownOrder);
        };

        let declared = params.get("money").map(String::as_str).unwrap_or_default();
        if !amounts_match(&order.amount, declared) {
            error!(
                order_no,
                stored = %order.amount,
                declared,
                "callback amount mismatch"
            );
            return Ok(CallbackOutcome::AmountMismatch);
        }

        let trade_status = params
            .get("trade_status")
            .map(String::as_str)
            .unwrap_or_default();
        if trade_status != TRADE_SUCCESS {
            // Acknowledge so the gateway stops re-delivering.
            warn!(order_no, trade_status, "callback with non-success trade status");
            return Ok(CallbackOutcome::NotActionable);
        }

        match self.settle_paid(&order, declared).await? {
            true => Ok(CallbackOutcome::Settled),
            false => {
                info!(order_no, "duplicate success callback acknowledged");
                Ok(CallbackOutcome::AlreadyPaid)
            }
        }
    }

    // ------------------------------------------------------------------
    // Settlement (shared by both paths)
    // ------------------------------------------------------------------

    /// Idempotent mark-paid-and-notify.
    ///
    /// Returns whether this call performed the transition; only the winner
    /// dispatches the notification. Notification failure is logged and
    /// swallowed — it never rolls back the status write.
    async fn settle_paid(&self, order: &Order, paid_amount: &str) -> PayResult<bool> {
        if !self.store.mark_paid(&order.order_no).await? {
            return Ok(false);
        }

        // Stop any scheduled poll cycle. The poll task releases its own
        // registration before settling, so this never aborts the caller.
        self.scheduler.cancel(&order.order_no).await;
        info!(order_no = %order.order_no, "order settled as paid");

        let notice = self.success_notice(order, paid_amount);
        if let Err(err) = self.notifier.deliver(&order.origin, &notice).await {
            error!(order_no = %order.order_no, error = %err, "payment notification failed");
        }
        Ok(true)
    }

    /// Success notice, always rendered with the payment method recorded at
    /// order creation — the gateway's callback is not the source of truth
    /// for the method choice.
    fn success_notice(&self, order: &Order, paid_amount: &str) -> String {
        let amount = if paid_amount.is_empty() {
            order.amount.as_str()
        } else {
            paid_amount
        };
        let mut lines = vec![
            "Payment received".to_string(),
            format!("Order: {}", order.order_no),
            format!("Amount: {amount}"),
            format!("Method: {}", self.epay.methods.display(&order.method)),
        ];
        if let Some(owner) = &order.owner {
            lines.push(format!("Owner: {owner}"));
        }
        lines.push(format!("Paid at: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")));
        lines.join("\n")
    }

    fn refund_notice(&self, order: &Order) -> String {
        [
            "Refund issued".to_string(),
            format!("Order: {}", order.order_no),
            format!("Amount: {}", order.amount),
        ]
        .join("\n")
    }

    // ------------------------------------------------------------------
    // Active-polling path
    // ------------------------------------------------------------------

    /// Start watching a pending order, unless it is already watched or has
    /// outlived the expiration window.
    pub async fn watch(self: &Arc<Self>, order: &Order) {
        if !self.recon.polling_enabled {
            return;
        }
        if self.is_expired(order) {
            debug!(order_no = %order.order_no, "order past expiration, not watching");
            return;
        }

        let engine = Arc::clone(self);
        let order_no = order.order_no.clone();
        self.scheduler
            .register(&order.order_no, move || {
                tokio::spawn(poll_loop(engine, order_no))
            })
            .await;
    }

    fn is_expired(&self, order: &Order) -> bool {
        order
            .age()
            .to_std()
            .map_or(false, |age| age > self.recon.expiration)
    }

    /// One poll cycle: age check, gateway query, settle or reschedule.
    async fn poll_cycle(&self, order_no: &str, cycle: u32) -> PollStep {
        debug!(order_no, cycle, "active poll cycle");

        let order = match self.store.find_by_order_no(order_no).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order_no, "watched order vanished from the store");
                return PollStep::Done;
            }
            Err(err) => {
                warn!(order_no, error = %err, "store lookup failed, will retry");
                return PollStep::Retry;
            }
        };

        // Settled through the callback path while this task slept.
        if order.status != OrderStatus::Pending {
            return PollStep::Done;
        }

        // Absence of terminal confirmation is not failure: the order stays
        // pending and queryable, polling just stops.
        if self.is_expired(&order) {
            info!(order_no, "order past expiration, stopping active polling");
            return PollStep::Done;
        }

        match self.gateway.query_order(order_no).await {
            Ok(current) if current.state.is_paid() => {
                // Drop our own registration before settling so the shared
                // settlement step cannot abort this task.
                self.scheduler.release(order_no).await;
                if let Err(err) = self.settle_paid(&order, &current.amount).await {
                    error!(order_no, error = %err, "poll settlement failed");
                }
                PollStep::Done
            }
            Ok(_) => {
                debug!(order_no, "gateway still reports unpaid");
                PollStep::Retry
            }
            Err(err) => {
                warn!(order_no, error = %err, "poll query failed");
                PollStep::Retry
            }
        }
    }

    // ------------------------------------------------------------------
    // Operator operations
    // ------------------------------------------------------------------

    /// Resolve an order by business or gateway order id.
    async fn resolve_order(&self, id: &str) -> PayResult<Order> {
        if let Some(order) = self.store.find_by_order_no(id).await? {
            return Ok(order);
        }
        if let Some(order) = self.store.find_by_gateway_no(id).await? {
            return Ok(order);
        }
        Err(PayError::OrderNotFound {
            order_no: id.to_string(),
        })
    }

    /// Forced manual query: ask the gateway right now, settle if it reports
    /// paid (cancelling any poll registration), and report the result.
    #[instrument(skip(self))]
    pub async fn force_query(&self, id: &str) -> PayResult<OrderReport> {
        let order = self.resolve_order(id).await?;
        let current = self.gateway.query_order(&order.order_no).await?;

        if current.state.is_paid() {
            self.settle_paid(&order, &current.amount).await?;
        }

        // Re-read for the authoritative local status after settlement.
        let status = self
            .store
            .find_by_order_no(&order.order_no)
            .await?
            .map(|o| o.status)
            .unwrap_or(order.status);

        Ok(OrderReport {
            order_no: order.order_no.clone(),
            gateway_no: current.gateway_no,
            amount: order.amount.clone(),
            method_display: self.epay.methods.display(&order.method).to_string(),
            status,
            owner: order.owner,
            created_time: current.created_time,
            completed_time: current.completed_time,
        })
    }

    /// Refund a paid order in full and notify the originating conversation.
    #[instrument(skip(self))]
    pub async fn refund(&self, id: &str) -> PayResult<RefundReceipt> {
        let order = self.resolve_order(id).await?;
        if order.status != OrderStatus::Paid {
            return Err(PayError::NotRefundable {
                order_no: order.order_no,
                status: order.status,
            });
        }

        self.gateway.refund(&order.order_no, &order.amount).await?;
        self.store
            .update_status(&order.order_no, OrderStatus::Refunded)
            .await?;
        info!(order_no = %order.order_no, "order refunded");

        let notice = self.refund_notice(&order);
        if let Err(err) = self.notifier.deliver(&order.origin, &notice).await {
            error!(order_no = %order.order_no, error = %err, "refund notification failed");
        }

        Ok(RefundReceipt {
            order_no: order.order_no,
            amount: order.amount,
        })
    }

    /// Assign an order to an owner (administrative provisioning).
    #[instrument(skip(self))]
    pub async fn assign_owner(&self, id: &str, owner: &str) -> PayResult<Order> {
        if !is_valid_owner_id(owner) {
            return Err(PayError::InvalidRequest(format!(
                "owner id must be 5-12 digits: {owner:?}"
            )));
        }
        let order = self.resolve_order(id).await?;
        self.store.update_owner(&order.order_no, owner).await?;
        self.store
            .find_by_order_no(&order.order_no)
            .await?
            .ok_or(PayError::OrderNotFound {
                order_no: order.order_no,
            })
    }

    /// Orders assigned to an owner, most recent first.
    pub async fn orders_for_owner(&self, owner: &str) -> PayResult<Vec<Order>> {
        self.store.list_by_owner(owner).await
    }

    /// Orders placed by a requester, most recent first.
    pub async fn orders_for_requester(
        &self,
        requester: &str,
        limit: usize,
    ) -> PayResult<Vec<Order>> {
        self.store.list_by_requester(requester, limit).await
    }
}

/// The poll task: initial wait, then cycles until settled, expired, or the
/// cycle cap is hit. Always releases its registration on exit.
async fn poll_loop(engine: Arc<ReconEngine>, order_no: String) {
    tokio::time::sleep(engine.recon.initial_wait).await;

    let mut cycles = 0u32;
    loop {
        cycles += 1;
        match engine.poll_cycle(&order_no, cycles).await {
            PollStep::Done => break,
            PollStep::Retry => {
                if cycles >= MAX_POLL_CYCLES {
                    debug!(%order_no, "poll cycle cap reached, giving up");
                    break;
                }
                tokio::time::sleep(engine.recon.poll_interval).await;
            }
        }
    }

    engine.scheduler.release(&order_no).await;
}
