//! In-process router between contexts.
//!
//! [`MemoryHub`] plays the part of the browser's extension messaging
//! router: every context gets a [`ContextTransport`] and the hub delivers
//! messages and connections between them. No context holds a reference
//! to another; all traffic is `serde_json::Value`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use textlens_protocols::TransportError;

use super::{
    ConnectListener, ContextId, ListenerId, MessageListener, MessageTransport, Port,
    PortTransport, SenderInfo, Target,
};

#[derive(Default)]
struct ContextSlot {
    message_listeners: Vec<(ListenerId, MessageListener)>,
    connect_listeners: Vec<(ListenerId, ConnectListener)>,
}

#[derive(Default)]
struct HubInner {
    contexts: RwLock<BTreeMap<ContextId, ContextSlot>>,
    next_listener_id: AtomicU64,
}

impl HubInner {
    fn next_id(&self) -> ListenerId {
        self.next_listener_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Message router shared by all contexts of one extension instance.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    /// Create a hub with no contexts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a transport bound to the given context.
    pub fn context(&self, id: ContextId) -> Arc<ContextTransport> {
        self.inner.contexts.write().entry(id).or_default();
        Arc::new(ContextTransport {
            id,
            hub: self.inner.clone(),
        })
    }

    /// Drop every listener of a context, as when a tab closes.
    pub fn remove_context(&self, id: ContextId) -> bool {
        let removed = self.inner.contexts.write().remove(&id).is_some();
        if removed {
            debug!("Context removed from hub: {}", id);
        }
        removed
    }

    /// Number of (message, connect) listeners installed by a context.
    pub fn listener_counts(&self, id: ContextId) -> (usize, usize) {
        self.inner
            .contexts
            .read()
            .get(&id)
            .map(|slot| (slot.message_listeners.len(), slot.connect_listeners.len()))
            .unwrap_or((0, 0))
    }
}

/// Transport endpoint of a single context.
pub struct ContextTransport {
    id: ContextId,
    hub: Arc<HubInner>,
}

impl ContextTransport {
    fn message_listeners_for(&self, target: &Target) -> Vec<MessageListener> {
        self.hub
            .contexts
            .read()
            .iter()
            .filter(|(ctx, _)| **ctx != self.id && target.matches(ctx))
            .flat_map(|(_, slot)| slot.message_listeners.iter().map(|(_, l)| l.clone()))
            .collect()
    }

    fn connect_listener_for(&self, target: &Target) -> Option<(ContextId, ConnectListener)> {
        self.hub
            .contexts
            .read()
            .iter()
            .filter(|(ctx, _)| **ctx != self.id && target.matches(ctx))
            .find_map(|(ctx, slot)| {
                slot.connect_listeners
                    .first()
                    .map(|(_, listener)| (*ctx, listener.clone()))
            })
    }
}

#[async_trait]
impl MessageTransport for ContextTransport {
    fn context(&self) -> ContextId {
        self.id
    }

    async fn send_message(
        &self,
        target: Target,
        message: Value,
    ) -> Result<Option<Value>, TransportError> {
        let listeners = self.message_listeners_for(&target);
        if listeners.is_empty() {
            return Err(TransportError::NoReceiver(target.to_string()));
        }

        trace!("Delivering message from {} to {} listener(s)", self.id, listeners.len());
        let sender = SenderInfo::new(self.id);
        for listener in listeners {
            if let Some(response) = listener(message.clone(), sender.clone()).await {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let id = self.hub.next_id();
        self.hub
            .contexts
            .write()
            .entry(self.id)
            .or_default()
            .message_listeners
            .push((id, listener));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        let mut contexts = self.hub.contexts.write();
        let Some(slot) = contexts.get_mut(&self.id) else {
            return false;
        };
        let before = slot.message_listeners.len();
        slot.message_listeners.retain(|(lid, _)| *lid != id);
        slot.message_listeners.len() != before
    }
}

impl PortTransport for ContextTransport {
    fn context(&self) -> ContextId {
        self.id
    }

    fn connect(&self, name: &str, target: Target) -> Result<Port, TransportError> {
        let (peer, listener) = self
            .connect_listener_for(&target)
            .ok_or_else(|| TransportError::NoReceiver(target.to_string()))?;

        let (local, remote) = Port::pair(name, SenderInfo::new(self.id), SenderInfo::new(peer));
        debug!("Port '{}' opened from {} to {}", name, self.id, peer);
        listener(remote);
        Ok(local)
    }

    fn add_connect_listener(&self, listener: ConnectListener) -> ListenerId {
        let id = self.hub.next_id();
        self.hub
            .contexts
            .write()
            .entry(self.id)
            .or_default()
            .connect_listeners
            .push((id, listener));
        id
    }

    fn remove_connect_listener(&self, id: ListenerId) -> bool {
        let mut contexts = self.hub.contexts.write();
        let Some(slot) = contexts.get_mut(&self.id) else {
            return false;
        };
        let before = slot.connect_listeners.len();
        slot.connect_listeners.retain(|(lid, _)| *lid != id);
        slot.connect_listeners.len() != before
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
