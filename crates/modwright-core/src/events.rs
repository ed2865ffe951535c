//! Minimal synchronous pub/sub.
//!
//! Each [`Topic`] keeps its own subscriber registry; publishing invokes
//! every currently-registered callback in subscription order with the
//! entire current payload (never a diff). A panicking subscriber is
//! isolated at the publish site and logged -- it never blocks delivery to
//! later subscribers and never propagates to the publisher.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use uuid::Uuid;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Registry<T> = Arc<Mutex<Vec<(Uuid, Callback<T>)>>>;

/// One subscription point of the event bus.
pub struct Topic<T> {
    subscribers: Registry<T>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Topic<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a callback. The returned [`Subscription`] stays active
    /// until [`Subscription::unsubscribe`] is called; dropping the handle
    /// leaves the subscription in place.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = Uuid::new_v4();
        lock(&self.subscribers).push((id, Arc::new(callback)));
        Subscription {
            id,
            remove: remover(&self.subscribers),
        }
    }

    /// Deliver `value` to every subscriber, synchronously and in
    /// subscription order.
    pub fn publish(&self, value: &T) {
        // Snapshot the registry so a callback may (un)subscribe without
        // deadlocking.
        let snapshot: Vec<(Uuid, Callback<T>)> = lock(&self.subscribers).clone();
        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                log::error!("event subscriber {id} panicked; delivery continues");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

fn lock<T>(registry: &Registry<T>) -> std::sync::MutexGuard<'_, Vec<(Uuid, Callback<T>)>> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn remover<T: 'static>(registry: &Registry<T>) -> Box<dyn FnOnce(Uuid) + Send> {
    let weak: Weak<Mutex<Vec<(Uuid, Callback<T>)>>> = Arc::downgrade(registry);
    Box::new(move |id| {
        if let Some(registry) = weak.upgrade() {
            registry
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|(sub_id, _)| *sub_id != id);
        }
    })
}

/// Handle for removing a subscriber from its topic.
#[must_use = "dropping the handle leaves the subscription active; keep it to unsubscribe later"]
pub struct Subscription {
    id: Uuid,
    remove: Box<dyn FnOnce(Uuid) + Send>,
}

impl Subscription {
    /// Remove the callback from the topic. Safe to call after the topic
    /// itself has been dropped.
    pub fn unsubscribe(self) {
        (self.remove)(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
