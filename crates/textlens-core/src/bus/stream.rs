//! Persistent, typed connection between two contexts.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use textlens_protocols::{create_event, Event, EventPayload, EventType};

use super::subscription::{HandlerTable, Subscription};
use crate::transport::{Port, SenderInfo};

/// Handler for events arriving on a stream.
pub type StreamHandler = Arc<dyn Fn(&Event) + Send + Sync>;

type CloseCallback = Box<dyn FnOnce() + Send>;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

struct StreamInner {
    id: u64,
    name: String,
    peer: SenderInfo,
    source: String,
    tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    handlers: Arc<HandlerTable<StreamHandler>>,
    close_callbacks: Mutex<Vec<CloseCallback>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl StreamInner {
    fn dispatch(&self, value: Value) {
        let event = match Event::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed event on stream '{}': {}", self.name, e);
                return;
            }
        };

        let event_type = event.event_type();
        let handlers = self.handlers.get(&event_type);
        if handlers.is_empty() {
            trace!("No handler for {} on stream '{}'", event_type, self.name);
            return;
        }

        for handler in handlers {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(
                    "Stream handler for {} on '{}' panicked",
                    event_type, self.name
                );
            }
        }
    }

    fn shut(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Dropping the sender is what the peer observes as a disconnect.
        self.tx.lock().take();
        self.shutdown.cancel();

        let callbacks = std::mem::take(&mut *self.close_callbacks.lock());
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                error!("Close callback for stream '{}' panicked", self.name);
            }
        }
        self.handlers.clear();
        true
    }
}

/// One end of a named persistent connection.
///
/// Cloning yields another handle to the same stream. Events are dispatched
/// one at a time in arrival order by a reader task owned by the stream.
#[derive(Clone)]
pub struct EventStream {
    inner: Arc<StreamInner>,
}

impl EventStream {
    /// Wrap a connected port and start reading from it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(port: Port, source: &str) -> Self {
        let Port { name, peer, tx, rx } = port;
        let inner = Arc::new(StreamInner {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::SeqCst),
            name,
            peer,
            source: source.to_string(),
            tx: Mutex::new(Some(tx)),
            handlers: Arc::new(HandlerTable::new()),
            close_callbacks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        });

        debug!(
            "Stream '{}' #{} opened with {}",
            inner.name, inner.id, inner.peer.context
        );
        tokio::spawn(read_loop(
            Arc::downgrade(&inner),
            rx,
            inner.shutdown.clone(),
        ));
        Self { inner }
    }

    /// Process-unique id of this stream.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Connection name the stream was opened with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The context on the other end.
    pub fn peer(&self) -> &SenderInfo {
        &self.inner.peer
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Send an event to the peer.
    ///
    /// Returns `false` when the stream is closed or the peer is gone; the
    /// failure is logged, never raised.
    pub fn send(&self, payload: EventPayload) -> bool {
        let event_type = payload.event_type();
        let value = match create_event(payload, Some(&self.inner.source)).to_value() {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode {} for stream '{}': {}", event_type, self.inner.name, e);
                return false;
            }
        };

        let tx = self.inner.tx.lock();
        let Some(tx) = tx.as_ref() else {
            debug!(
                "Dropping {} sent on closed stream '{}'",
                event_type, self.inner.name
            );
            return false;
        };
        if tx.send(value).is_err() {
            warn!(
                "Peer of stream '{}' is gone, dropping {}",
                self.inner.name, event_type
            );
            return false;
        }
        true
    }

    /// Register a handler for one event type.
    pub fn on_message<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Subscription::noop();
        }
        let id = self
            .inner
            .handlers
            .insert(event_type.clone(), Arc::new(handler));
        let table = Arc::downgrade(&self.inner.handlers);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.remove(&event_type, id);
            }
        })
    }

    /// Run a callback once the stream closes, from either side. Runs
    /// immediately if the stream is already closed.
    pub fn on_close<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.inner.close_callbacks.lock();
        if self.is_closed() {
            drop(callbacks);
            callback();
            return;
        }
        callbacks.push(Box::new(callback));
    }

    /// Close the stream. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let closed = self.inner.shut();
        if closed {
            debug!("Stream '{}' #{} closed", self.inner.name, self.inner.id);
        }
        closed
    }

    /// Number of registered message handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("peer", &self.inner.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn read_loop(
    inner: Weak<StreamInner>,
    mut rx: mpsc::UnboundedReceiver<Value>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            message = rx.recv() => message,
        };

        let Some(inner) = inner.upgrade() else {
            return;
        };
        match message {
            Some(value) => inner.dispatch(value),
            None => {
                if inner.shut() {
                    debug!("Stream '{}' #{} disconnected by peer", inner.name, inner.id);
                }
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
