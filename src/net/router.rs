//! Event router — inbound frame dispatch by event/operation key.
//!
//! ARCHITECTURE
//! ============
//! The source protocol conflated two uses of one handler table: steady-state
//! event subscription and one-shot request/response correlation, with the
//! newest registration silently clobbering the rest. This router separates
//! them:
//!
//! - *Subscriptions* are an ordered fan-out list per key. Each subscription
//!   is independently removable and fires on every matching frame.
//! - *Pending waiters* are at most one in-flight `oneshot` per operation
//!   key, resolved and cleared atomically on the first matching frame.
//!   Registering a new waiter for an operation supersedes the previous one,
//!   which resolves with [`RequestError::Superseded`] instead of hanging.
//!
//! A dispatched frame reaches the pending waiter first (if any), then every
//! subscriber in registration order.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::sync::oneshot;

type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Why a [`request`](crate::net::Connection::request) future resolved
/// without a response.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A newer request for the same operation replaced this waiter, or the
    /// session shut down before the response arrived.
    #[error("request superseded before a response arrived")]
    Superseded,
}

struct SubscriberEntry {
    id: u64,
    callback: EventCallback,
}

#[derive(Default)]
struct RouterInner {
    next_id: u64,
    subscribers: HashMap<String, Vec<SubscriberEntry>>,
    pending: HashMap<String, oneshot::Sender<Value>>,
}

/// Name-keyed dispatch table shared between the connection actor and the
/// public connection handle.
#[derive(Clone, Default)]
pub struct EventRouter {
    inner: Arc<Mutex<RouterInner>>,
}

/// Removal handle for one steady-state subscription.
pub struct Subscription {
    inner: Weak<Mutex<RouterInner>>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Remove this subscription. Other subscriptions on the same key are
    /// untouched. Safe to call after the router is gone.
    pub fn unsubscribe(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = inner.subscribers.get_mut(&self.key) {
            entries.retain(|entry| entry.id != self.id);
            if entries.is_empty() {
                inner.subscribers.remove(&self.key);
            }
        }
    }
}

impl EventRouter {
    fn lock(&self) -> MutexGuard<'_, RouterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a steady-state subscriber for `key`, firing after all earlier
    /// subscribers on that key.
    pub fn subscribe(
        &self,
        key: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .subscribers
            .entry(key.to_owned())
            .or_default()
            .push(SubscriberEntry {
                id,
                callback: Arc::new(callback),
            });

        Subscription {
            inner: Arc::downgrade(&self.inner),
            key: key.to_owned(),
            id,
        }
    }

    /// Install the single in-flight waiter for `operation`, superseding any
    /// previous one. The returned receiver resolves with the `data` of the
    /// first matching inbound frame.
    pub(crate) fn register_pending(&self, operation: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        let previous = self.lock().pending.insert(operation.to_owned(), tx);
        if previous.is_some() {
            tracing::warn!(operation, "superseding in-flight request waiter");
        }
        rx
    }

    /// Deliver a frame payload: resolve-and-clear the pending waiter for
    /// `key` first, then fan out to subscribers in registration order. A
    /// panicking subscriber is logged and does not stop the rest.
    pub(crate) fn dispatch(&self, key: &str, payload: Value) {
        let (waiter, subscribers) = {
            let mut inner = self.lock();
            let waiter = inner.pending.remove(key);
            let subscribers: Vec<EventCallback> = inner
                .subscribers
                .get(key)
                .map(|entries| entries.iter().map(|entry| entry.callback.clone()).collect())
                .unwrap_or_default();
            (waiter, subscribers)
        };

        if let Some(waiter) = waiter {
            // The receiver may already be gone (request timed out); fine.
            let _ = waiter.send(payload.clone());
        }

        for callback in subscribers {
            if catch_unwind(AssertUnwindSafe(|| callback(&payload))).is_err() {
                tracing::error!(key, "event subscriber panicked");
            }
        }
    }

    /// Number of subscribers currently registered for `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock().subscribers.get(key).map_or(0, Vec::len)
    }

    /// Whether an in-flight waiter exists for `operation`.
    #[must_use]
    pub fn has_pending(&self, operation: &str) -> bool {
        self.lock().pending.contains_key(operation)
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
