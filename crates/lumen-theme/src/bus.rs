//! Change notification fan-out.
//!
//! Delivery is synchronous on the task that produced the change. The
//! subscriber list is snapshotted before iteration so callbacks may
//! subscribe or unsubscribe during a notification, and a panicking
//! subscriber is isolated from the rest.

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A state transition published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ThemeEvent {
    Initialized,
    PreviewChanged,
    PreviewCleared,
    CommittedChanged,
    ExternalUpdate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Arc<dyn Fn(&ThemeEvent) + Send + Sync>;

pub struct ChangeBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriberId, Subscriber)>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback; returns the id to pass to [`unsubscribe`].
    ///
    /// [`unsubscribe`]: ChangeBus::unsubscribe
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&ThemeEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Deliver an event to every current subscriber; returns how many
    /// callbacks ran to completion.
    pub fn publish(&self, event: &ThemeEvent) -> usize {
        // Snapshot under the lock, invoke outside it: callbacks may
        // re-enter subscribe/unsubscribe.
        let snapshot: Vec<(SubscriberId, Subscriber)> =
            self.subscribers.lock().unwrap().clone();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(subscriber = id.0, ?event, "subscriber panicked during notification");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Drop every subscriber. Used on service disposal.
    pub fn clear(&self) {
        self.subscribers.lock().unwrap().clear();
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
