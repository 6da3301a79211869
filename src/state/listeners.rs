//! Ordered listener registry with isolated callback invocation.
//!
//! DESIGN
//! ======
//! - Firing order equals registration order.
//! - `add` returns a [`ListenerHandle`]; dropping the handle does NOT
//!   unsubscribe (removal is always explicit), so callers cannot lose a
//!   listener by accident.
//! - Each invocation is isolated with `catch_unwind`: one panicking
//!   listener is logged and the remaining listeners still run.
//! - Callbacks are cloned out of the registry before invocation, so a
//!   listener may freely re-enter the owning store.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

/// An ordered list of callbacks for one reactive attribute.
pub struct ListenerRegistry<T> {
    entries: Arc<Mutex<Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

/// Removal handle returned by [`ListenerRegistry::add`].
pub struct ListenerHandle {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerHandle {
    /// Remove the listener this handle was created for. Safe to call after
    /// the registry has been dropped.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T: Copy + Send + 'static> ListenerRegistry<T> {
    /// Register a callback; it fires after all previously added callbacks.
    pub fn add(&self, callback: impl Fn(T) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                callback: Arc::new(callback),
            });

        let entries: Weak<Mutex<Vec<Entry<T>>>> = Arc::downgrade(&self.entries);
        ListenerHandle {
            remove: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|entry| entry.id != id);
                }
            })),
        }
    }

    /// Fire every registered callback in order with `value`.
    pub fn emit(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.callback.clone())
            .collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::error!("listener panicked; remaining listeners still run");
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "listeners_test.rs"]
mod tests;
