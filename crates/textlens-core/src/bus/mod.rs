//! Typed message bus.
//!
//! [`MessageBus`] turns the two raw transport primitives into typed
//! pub/sub ([`MessageBus::subscribe`] / [`MessageBus::publish`]) and
//! named persistent streams ([`MessageBus::create_stream`] /
//! [`MessageBus::listen_for_streams`]).
//!
//! Transport faults never escape a dispatch loop: one-shot sends surface
//! them as [`BusError`], stream sends log and return `false`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, error, warn};

use textlens_protocols::{create_event, Event, EventPayload, EventType};

use crate::registry::{StreamIdentifier, StreamRegistry};
use crate::transport::{
    ConnectListener, ContextId, ListenerId, MessageListener, MessageResponse, MessageTransport,
    Port, PortTransport, SenderInfo, Target,
};

mod error;
mod stream;
mod subscription;

pub use error::{BusError, HandlerError};
pub use stream::{EventStream, StreamHandler};
pub use subscription::Subscription;

use subscription::HandlerTable;

/// Result of a one-shot handler: an optional response for the sender.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// One-shot event handler.
pub type MessageHandler = Arc<dyn Fn(&Event, &SenderInfo) -> HandlerResult + Send + Sync>;

/// Acceptor for incoming streams.
pub type ConnectHandler = Arc<dyn Fn(EventStream, StreamIdentifier) + Send + Sync>;

struct Acceptor {
    id: u64,
    prefix: String,
    handler: ConnectHandler,
}

struct BusInner {
    messages: Arc<dyn MessageTransport>,
    ports: Arc<dyn PortTransport>,
    source: String,
    registry: Arc<StreamRegistry>,
    handlers: Arc<HandlerTable<MessageHandler>>,
    message_listener: Mutex<Option<ListenerId>>,
    acceptors: Arc<RwLock<Vec<Acceptor>>>,
    next_acceptor_id: AtomicU64,
    connect_listener: Mutex<Option<ListenerId>>,
}

impl Drop for BusInner {
    fn drop(&mut self) {
        if let Some(id) = self.message_listener.get_mut().take() {
            self.messages.remove_message_listener(id);
        }
        if let Some(id) = self.connect_listener.get_mut().take() {
            self.ports.remove_connect_listener(id);
        }
    }
}

/// Typed pub/sub and stream multiplexing for one context.
///
/// Cheap to clone; clones share handlers and the stream registry.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Create a bus over a transport implementing both primitives, with a
    /// private stream registry.
    pub fn new<T>(transport: Arc<T>, source: &str) -> Self
    where
        T: MessageTransport + PortTransport + 'static,
    {
        Self::with_registry(transport, source, Arc::new(StreamRegistry::new()))
    }

    /// Create a bus that records accepted streams in the given registry.
    pub fn with_registry<T>(transport: Arc<T>, source: &str, registry: Arc<StreamRegistry>) -> Self
    where
        T: MessageTransport + PortTransport + 'static,
    {
        let messages: Arc<dyn MessageTransport> = transport.clone();
        let ports: Arc<dyn PortTransport> = transport;
        Self::from_parts(messages, ports, source, registry)
    }

    /// Create a bus from separately supplied primitives.
    pub fn from_parts(
        messages: Arc<dyn MessageTransport>,
        ports: Arc<dyn PortTransport>,
        source: &str,
        registry: Arc<StreamRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(BusInner {
                messages,
                ports,
                source: source.to_string(),
                registry,
                handlers: Arc::new(HandlerTable::new()),
                message_listener: Mutex::new(None),
                acceptors: Arc::new(RwLock::new(Vec::new())),
                next_acceptor_id: AtomicU64::new(1),
                connect_listener: Mutex::new(None),
            }),
        }
    }

    /// Source stamped on every outgoing event.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Context this bus runs in.
    pub fn context(&self) -> ContextId {
        self.inner.messages.context()
    }

    /// Streams accepted by [`MessageBus::listen_for_streams`].
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.inner.registry
    }

    /// Register a one-shot handler for an event type.
    ///
    /// Handlers for a type run in registration order. A handler that
    /// fails or panics is logged and the remaining handlers still run. The
    /// first `Some` response is returned to the sender.
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&Event, &SenderInfo) -> HandlerResult + Send + Sync + 'static,
    {
        self.ensure_message_listener();
        let id = self
            .inner
            .handlers
            .insert(event_type.clone(), Arc::new(handler));
        debug!("Subscribed to {} on {}", event_type, self.inner.source);

        let table = Arc::downgrade(&self.inner.handlers);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.remove(&event_type, id);
            }
        })
    }

    /// Publish an event as a one-shot message.
    ///
    /// Without a target the event goes to the extension pages (background
    /// and popup); with one it goes to the content scripts of that tab.
    pub async fn publish(
        &self,
        payload: EventPayload,
        target: Option<Target>,
    ) -> Result<Option<Value>, BusError> {
        let target = target.unwrap_or(Target::Extension);
        let event_type = payload.event_type();
        let value = create_event(payload, Some(&self.inner.source)).to_value()?;

        self.inner
            .messages
            .send_message(target, value)
            .await
            .map_err(|e| {
                warn!("Failed to publish {} to {}: {}", event_type, target, e);
                BusError::from(e)
            })
    }

    /// Open a named stream. Without a target it connects to the extension
    /// pages.
    pub fn create_stream(&self, name: &str, target: Option<Target>) -> Result<EventStream, BusError> {
        let target = target.unwrap_or(Target::Extension);
        let port = self.inner.ports.connect(name, target).map_err(|e| {
            warn!("Failed to open stream '{}' to {}: {}", name, target, e);
            BusError::from(e)
        })?;
        Ok(EventStream::spawn(port, &self.inner.source))
    }

    /// Accept incoming streams whose name starts with `prefix`.
    ///
    /// Only one low-level connect listener is installed per bus; further
    /// acceptors attach to it. Every matching acceptor sees the stream, in
    /// registration order. Accepted streams are tracked in the registry
    /// until they close.
    pub fn listen_for_streams<F>(&self, prefix: &str, on_connect: F) -> Subscription
    where
        F: Fn(EventStream, StreamIdentifier) + Send + Sync + 'static,
    {
        let id = self.inner.next_acceptor_id.fetch_add(1, Ordering::SeqCst);
        self.inner.acceptors.write().push(Acceptor {
            id,
            prefix: prefix.to_string(),
            handler: Arc::new(on_connect),
        });
        self.ensure_connect_listener();
        debug!("Listening for streams with prefix '{}'", prefix);

        let acceptors = Arc::downgrade(&self.inner.acceptors);
        Subscription::new(move || {
            if let Some(acceptors) = acceptors.upgrade() {
                acceptors.write().retain(|acceptor| acceptor.id != id);
            }
        })
    }

    fn ensure_message_listener(&self) {
        let mut installed = self.inner.message_listener.lock();
        if installed.is_some() {
            return;
        }
        let handlers = Arc::downgrade(&self.inner.handlers);
        let source = self.inner.source.clone();
        let listener: MessageListener = Arc::new(
            move |value: Value, sender: SenderInfo| -> MessageResponse {
                let response = handlers
                    .upgrade()
                    .and_then(|handlers| dispatch_message(&handlers, &source, value, &sender));
                Box::pin(async move { response })
            },
        );
        *installed = Some(self.inner.messages.add_message_listener(listener));
    }

    fn ensure_connect_listener(&self) {
        let mut installed = self.inner.connect_listener.lock();
        if installed.is_some() {
            return;
        }
        let acceptors = Arc::downgrade(&self.inner.acceptors);
        let registry = Arc::downgrade(&self.inner.registry);
        let source = self.inner.source.clone();
        let listener: ConnectListener = Arc::new(move |port: Port| {
            accept_stream(&acceptors, &registry, &source, port);
        });
        *installed = Some(self.inner.ports.add_connect_listener(listener));
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("source", &self.inner.source)
            .field("context", &self.context())
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

fn dispatch_message(
    handlers: &HandlerTable<MessageHandler>,
    source: &str,
    value: Value,
    sender: &SenderInfo,
) -> Option<Value> {
    let event = match Event::from_value(value) {
        Ok(event) => event,
        Err(e) => {
            warn!("{} dropping malformed message from {}: {}", source, sender.context, e);
            return None;
        }
    };

    let event_type = event.event_type();
    let mut response = None;
    for handler in handlers.get(&event_type) {
        match catch_unwind(AssertUnwindSafe(|| handler(&event, sender))) {
            Ok(Ok(Some(value))) => {
                if response.is_none() {
                    response = Some(value);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => warn!("Handler for {} failed: {}", event_type, e),
            Err(_) => error!("Handler for {} panicked", event_type),
        }
    }
    response
}

fn accept_stream(
    acceptors: &Weak<RwLock<Vec<Acceptor>>>,
    registry: &Weak<StreamRegistry>,
    source: &str,
    port: Port,
) {
    let (Some(acceptors), Some(registry)) = (acceptors.upgrade(), registry.upgrade()) else {
        return;
    };
    let handlers: Vec<ConnectHandler> = acceptors
        .read()
        .iter()
        .filter(|acceptor| port.name.starts_with(&acceptor.prefix))
        .map(|acceptor| acceptor.handler.clone())
        .collect();
    if handlers.is_empty() {
        // Dropping the port disconnects the caller.
        debug!("No acceptor for stream '{}', dropping", port.name);
        return;
    }

    let identifier = StreamIdentifier::from_sender(&port.peer);
    let name = port.name.clone();
    let stream = EventStream::spawn(port, source);
    registry.insert(&name, identifier, stream.clone());

    let stream_id = stream.id();
    let registry = Arc::downgrade(&registry);
    stream.on_close(move || {
        if let Some(registry) = registry.upgrade() {
            registry.remove_if(&name, identifier, stream_id);
        }
    });

    for handler in handlers {
        if catch_unwind(AssertUnwindSafe(|| handler(stream.clone(), identifier))).is_err() {
            error!("Stream acceptor for '{}' panicked", stream.name());
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
