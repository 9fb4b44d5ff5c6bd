//! # Polling Registrations
//!
//! Process-local bookkeeping for in-flight poll cycles: at most one task
//! per business order id, owned by an explicit scheduler object with a
//! deterministic shutdown. Cancellation is a single map removal.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct Registration {
    handle: JoinHandle<()>,
}

/// Registration table for active poll tasks.
///
/// Two removal flavors with different intent:
/// [`release`](PollScheduler::release) detaches a task that is finishing on
/// its own (the poll task removes its own entry before settling, so it is
/// never aborted mid-notification), while [`cancel`](PollScheduler::cancel)
/// aborts an order's sleeping task outright.
#[derive(Default)]
pub struct PollScheduler {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a poll task for an order, spawning it only if no
    /// registration exists yet. Returns whether a task was registered.
    pub async fn register<F>(&self, order_no: &str, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut registrations = self.registrations.lock().await;
        if registrations.contains_key(order_no) {
            debug!(order_no, "already watching, registration refused");
            return false;
        }
        let handle = spawn();
        registrations.insert(order_no.to_string(), Registration { handle });
        true
    }

    /// Remove an order's registration without aborting its task.
    pub async fn release(&self, order_no: &str) -> bool {
        self.registrations.lock().await.remove(order_no).is_some()
    }

    /// Remove an order's registration and abort its task. Safe and
    /// idempotent for orders that were never registered.
    pub async fn cancel(&self, order_no: &str) -> bool {
        match self.registrations.lock().await.remove(order_no) {
            Some(registration) => {
                registration.handle.abort();
                debug!(order_no, "poll registration cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every registered task. Called on engine shutdown so no timer
    /// wakes up into a torn-down process.
    pub async fn shutdown(&self) {
        let mut registrations = self.registrations.lock().await;
        let count = registrations.len();
        for (_, registration) in registrations.drain() {
            registration.handle.abort();
        }
        if count > 0 {
            debug!(count, "cancelled active poll registrations on shutdown");
        }
    }

    pub async fn is_watching(&self, order_no: &str) -> bool {
        self.registrations.lock().await.contains_key(order_no)
    }

    pub async fn active_count(&self) -> usize {
        self.registrations.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn sleeper() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
    }

    #[tokio::test]
    async fn test_single_registration_per_order() {
        let scheduler = PollScheduler::new();

        assert!(scheduler.register("o1", sleeper).await);
        assert!(!scheduler.register("o1", sleeper).await);
        assert!(scheduler.is_watching("o1").await);
        assert_eq!(scheduler.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_refused_registration_does_not_spawn() {
        let scheduler = PollScheduler::new();
        scheduler.register("o1", sleeper).await;

        let spawned = Arc::new(AtomicBool::new(false));
        let flag = spawned.clone();
        scheduler
            .register("o1", move || {
                flag.store(true, Ordering::SeqCst);
                sleeper()
            })
            .await;
        assert!(!spawned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let scheduler = PollScheduler::new();
        scheduler.register("o1", sleeper).await;

        assert!(scheduler.cancel("o1").await);
        assert!(!scheduler.cancel("o1").await);
        assert!(!scheduler.is_watching("o1").await);
    }

    #[tokio::test]
    async fn test_release_detaches_without_abort() {
        let scheduler = PollScheduler::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        scheduler
            .register("o1", move || {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    flag.store(true, Ordering::SeqCst);
                })
            })
            .await;

        assert!(scheduler.release("o1").await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // the detached task still ran to completion
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_shutdown_drains_everything() {
        let scheduler = PollScheduler::new();
        scheduler.register("o1", sleeper).await;
        scheduler.register("o2", sleeper).await;
        assert_eq!(scheduler.active_count().await, 2);

        scheduler.shutdown().await;
        assert_eq!(scheduler.active_count().await, 0);
    }
}
