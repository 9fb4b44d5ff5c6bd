//! # Notification Fan-Out
//!
//! Best-effort delivery of reconciliation results back to the conversation
//! an order came from. Channels (bot connections) are tried in registration
//! order until one succeeds; delivery failure never blocks or rolls back a
//! settlement.

use crate::error::{PayError, PayResult};
use crate::order::OrderOrigin;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// A single delivery capability (typically one bot connection).
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Stable identifier used in logs, e.g. `onebot:10001`.
    fn label(&self) -> String;

    /// Deliver into a group channel.
    async fn send_to_group(&self, channel_id: &str, text: &str) -> PayResult<()>;

    /// Deliver directly to a user.
    async fn send_private(&self, user_id: &str, text: &str) -> PayResult<()>;
}

/// Type alias for a shared delivery channel (dynamic dispatch)
pub type SharedChannel = Arc<dyn DeliveryChannel>;

/// Ordered channel list with first-success early exit.
#[derive(Clone, Default)]
pub struct Notifier {
    channels: Vec<SharedChannel>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel; channels are tried in registration order.
    pub fn register(&mut self, channel: SharedChannel) {
        self.channels.push(channel);
    }

    /// Builder variant of [`register`](Self::register).
    pub fn with_channel(mut self, channel: SharedChannel) -> Self {
        self.register(channel);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver `text` to the conversation the order came from.
    ///
    /// Group origins go to the group channel, private origins to the user.
    /// Stops at the first channel that succeeds; returns `NotifyFailed` only
    /// when every channel failed (callers log and move on).
    pub async fn deliver(&self, origin: &OrderOrigin, text: &str) -> PayResult<()> {
        for channel in &self.channels {
            let sent = match origin {
                OrderOrigin::Group { channel_id, .. } => {
                    channel.send_to_group(channel_id, text).await
                }
                OrderOrigin::Private { user_id } => channel.send_private(user_id, text).await,
            };
            match sent {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(channel = %channel.label(), error = %err, "delivery channel failed");
                }
            }
        }
        Err(PayError::NotifyFailed(format!(
            "all {} delivery channels failed",
            self.channels.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedChannel {
        label: &'static str,
        fail: bool,
        sent: AtomicUsize,
    }

    impl ScriptedChannel {
        fn new(label: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                label,
                fail,
                sent: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DeliveryChannel for ScriptedChannel {
        fn label(&self) -> String {
            self.label.to_string()
        }

        async fn send_to_group(&self, _channel_id: &str, _text: &str) -> PayResult<()> {
            self.send_private("", "").await
        }

        async fn send_private(&self, _user_id: &str, _text: &str) -> PayResult<()> {
            if self.fail {
                return Err(PayError::Network("connection reset".into()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn private_origin() -> OrderOrigin {
        OrderOrigin::Private {
            user_id: "10001".into(),
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let broken = ScriptedChannel::new("bot-a", true);
        let working = ScriptedChannel::new("bot-b", false);
        let spare = ScriptedChannel::new("bot-c", false);

        let notifier = Notifier::new()
            .with_channel(broken.clone())
            .with_channel(working.clone())
            .with_channel(spare.clone());

        notifier.deliver(&private_origin(), "hi").await.unwrap();

        assert_eq!(working.sent.load(Ordering::SeqCst), 1);
        // later channels are never tried after a success
        assert_eq!(spare.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let notifier = Notifier::new()
            .with_channel(ScriptedChannel::new("bot-a", true))
            .with_channel(ScriptedChannel::new("bot-b", true));

        let err = notifier.deliver(&private_origin(), "hi").await.unwrap_err();
        assert!(matches!(err, PayError::NotifyFailed(_)));
    }

    #[tokio::test]
    async fn test_group_origin_targets_channel() {
        let working = ScriptedChannel::new("bot-a", false);
        let notifier = Notifier::new().with_channel(working.clone());

        let origin = OrderOrigin::Group {
            guild_id: "g1".into(),
            channel_id: "c1".into(),
        };
        notifier.deliver(&origin, "hi").await.unwrap();
        assert_eq!(working.sent.load(Ordering::SeqCst), 1);
    }
}
