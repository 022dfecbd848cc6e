//! Registry event bus.
//!
//! Registration, removal, update, batch, and clear operations publish typed
//! events consumers use for cache invalidation elsewhere or hot-reload
//! propagation. Delivery is isolated per subscriber: a panicking listener is
//! caught and logged at the emission site, and neither blocks other
//! listeners nor propagates to the caller that triggered the event.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::warn;

/// Kind of registry mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistryEventType {
    Registered,
    Unregistered,
    Updated,
    BatchRegistered,
    Cleared,
}

/// One registry mutation notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEvent {
    pub event_type: RegistryEventType,
    pub timestamp: SystemTime,
    /// Affected endpoint for single-endpoint events
    pub endpoint_id: Option<String>,
    /// Affected endpoint count for batch/clear events
    pub count: Option<usize>,
}

impl RegistryEvent {
    pub(crate) fn single(event_type: RegistryEventType, endpoint_id: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            endpoint_id: Some(endpoint_id.into()),
            count: None,
        }
    }

    pub(crate) fn bulk(event_type: RegistryEventType, count: usize) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            endpoint_id: None,
            count: Some(count),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
pub type ListenerId = u64;

type Listener = Box<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Callback-registration publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
    emitted: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; returns an id usable with [`EventBus::unsubscribe`].
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push((id, Box::new(listener)));
        }
        id
    }

    /// Remove a listener. Returns whether it was present.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let Ok(mut listeners) = self.listeners.write() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener.
    ///
    /// Listener panics are caught and logged; delivery continues with the
    /// remaining listeners.
    pub fn emit(&self, event: &RegistryEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        let Ok(listeners) = self.listeners.read() else {
            return;
        };
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    listener_id = id,
                    event_type = ?event.event_type,
                    "Registry event listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}
