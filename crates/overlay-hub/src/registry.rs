//! Typed per-kind subscriber registry.
//!
//! Dispatch iterates over a snapshot of the registration list taken while
//! holding the lock, then invokes handlers with the lock released, so a
//! handler may subscribe or unsubscribe (including itself) from within its
//! own invocation without corrupting the dispatch in progress. Removal takes
//! effect no later than the next dispatch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use openoverlay_telemetry::{EventKind, TelemetryEvent};

/// Callback registered for one event kind. Must return quickly; the hub
/// performs no per-handler timeout.
pub type EventHandler = Arc<dyn Fn(&TelemetryEvent) + Send + Sync>;

/// Handle identifying one registration. Deterministic unsubscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    kind: EventKind,
    id: u64,
}

impl SubscriptionId {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<EventKind, Vec<(u64, EventHandler)>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.entry(kind).or_default().push((id, handler));
        SubscriptionId { kind, id }
    }

    /// Remove a registration. Idempotent; returns whether anything was
    /// removed.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = handlers.get_mut(&subscription.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != subscription.id);
        entries.len() != before
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// Each handler registered at dispatch time sees the event exactly once;
    /// relative order across handlers is unspecified.
    pub fn dispatch(&self, event: &TelemetryEvent) {
        let snapshot: Vec<EventHandler> = {
            let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            handlers
                .get(&event.kind())
                .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            handler(event);
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.get(&kind).map(Vec::len).unwrap_or(0)
    }
}
