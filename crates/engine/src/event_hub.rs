// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast of supervisor events to independent subscribers.
//!
//! Every subscriber sees every event it is interested in, in emission order.
//! Delivery is serialized across emitting threads so two subscribers never
//! disagree about ordering. Listeners run on the emitting thread and must
//! not block; relays forward into a channel.

use parking_lot::{Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tether_core::{BridgeEvent, EventKind};

type Listener = Arc<dyn Fn(&BridgeEvent) + Send + Sync>;

struct Entry {
    id: u64,
    filter: Option<EventKind>,
    listener: Listener,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
    delivery: ReentrantMutex<()>,
}

#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(listener))
    }

    /// Register a listener for one kind of event.
    pub fn subscribe_kind<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(listener))
    }

    fn register(&self, filter: Option<EventKind>, listener: Listener) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push(Entry {
            id,
            filter,
            listener,
        });
        Subscription {
            hub: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn emit(&self, event: &BridgeEvent) {
        let _order = self.inner.delivery.lock();
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .inner
            .entries
            .lock()
            .iter()
            .filter(|e| e.filter.is_none() || e.filter == Some(kind))
            .map(|e| Arc::clone(&e.listener))
            .collect();
        tracing::trace!(event = %event.log_summary(), listeners = listeners.len(), "emit");
        for listener in listeners {
            listener(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.lock().len()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<HubInner>,
    id: Option<u64>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(id) = self.id.take() else { return };
        if let Some(hub) = self.hub.upgrade() {
            hub.entries.lock().retain(|e| e.id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
#[path = "event_hub_tests.rs"]
mod tests;
