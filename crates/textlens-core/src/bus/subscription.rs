//! Handler tables and disposable subscription handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use textlens_protocols::EventType;

/// Handle returned by every registration on the bus.
///
/// Dropping the handle keeps the registration alive; call
/// [`Subscription::unsubscribe`] to remove it. Unsubscribing is idempotent.
pub struct Subscription {
    remover: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(remover: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remover: Mutex::new(Some(Box::new(remover))),
        }
    }

    /// A handle that removes nothing.
    pub fn noop() -> Self {
        Self {
            remover: Mutex::new(None),
        }
    }

    /// Remove the registration.
    pub fn unsubscribe(&self) {
        let remover = self.remover.lock().take();
        if let Some(remover) = remover {
            remover();
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.remover.lock().is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handlers grouped by event type, kept in registration order.
pub(crate) struct HandlerTable<H: Clone> {
    entries: RwLock<HashMap<EventType, Vec<(u64, H)>>>,
    next_id: AtomicU64,
}

impl<H: Clone> HandlerTable<H> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn insert(&self, event_type: EventType, handler: H) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .entry(event_type)
            .or_default()
            .push((id, handler));
        id
    }

    pub(crate) fn remove(&self, event_type: &EventType, id: u64) -> bool {
        let mut entries = self.entries.write();
        let Some(handlers) = entries.get_mut(event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            entries.remove(event_type);
        }
        removed
    }

    /// Snapshot of the handlers for a type, in registration order.
    pub(crate) fn get(&self, event_type: &EventType) -> Vec<H> {
        self.entries
            .read()
            .get(event_type)
            .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}
