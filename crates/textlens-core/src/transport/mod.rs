//! Transport adapters.
//!
//! Two primitives mirror the host browser's messaging APIs:
//!
//! - [`MessageTransport`] - fire-and-forget messages with an optional response
//! - [`PortTransport`] - persistent, ordered, bidirectional [`Port`]s named by
//!   a connection name
//!
//! Both carry `serde_json::Value`s; typing happens one layer up in the bus.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;

use textlens_protocols::TransportError;

mod memory;

pub use memory::{ContextTransport, MemoryHub};

/// Listener registration id.
pub type ListenerId = u64;

/// Future resolving to a listener's response (`None` = no response).
pub type MessageResponse = BoxFuture<'static, Option<Value>>;

/// One-shot message listener.
pub type MessageListener = Arc<dyn Fn(Value, SenderInfo) -> MessageResponse + Send + Sync>;

/// Incoming connection listener.
pub type ConnectListener = Arc<dyn Fn(Port) + Send + Sync>;

/// An isolated execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextId {
    /// The background service worker hosting the model engine.
    Background,
    /// The browser-action popup.
    Popup,
    /// A content script running in one frame of a tab.
    Tab { tab_id: i64, frame_id: i64 },
}

impl ContextId {
    /// Content script in the top frame of a tab.
    pub fn tab(tab_id: i64) -> Self {
        Self::Tab {
            tab_id,
            frame_id: 0,
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => f.write_str("background"),
            Self::Popup => f.write_str("popup"),
            Self::Tab { tab_id, frame_id } => write!(f, "tab {}/{}", tab_id, frame_id),
        }
    }
}

/// Message or connection destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Extension pages: the background and, if open, the popup.
    Extension,
    /// Content scripts of a tab; all frames unless `frame_id` is set.
    Tab { tab_id: i64, frame_id: Option<i64> },
}

impl Target {
    pub fn tab(tab_id: i64) -> Self {
        Self::Tab {
            tab_id,
            frame_id: None,
        }
    }

    pub fn frame(tab_id: i64, frame_id: i64) -> Self {
        Self::Tab {
            tab_id,
            frame_id: Some(frame_id),
        }
    }

    /// Whether a context is addressed by this target.
    pub fn matches(&self, context: &ContextId) -> bool {
        match (self, context) {
            (Self::Extension, ContextId::Background | ContextId::Popup) => true,
            (
                Self::Tab { tab_id, frame_id },
                ContextId::Tab {
                    tab_id: ctx_tab,
                    frame_id: ctx_frame,
                },
            ) => tab_id == ctx_tab && frame_id.is_none_or(|f| f == *ctx_frame),
            _ => false,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension => f.write_str("extension"),
            Self::Tab {
                tab_id,
                frame_id: Some(frame_id),
            } => write!(f, "tab {}/{}", tab_id, frame_id),
            Self::Tab { tab_id, .. } => write!(f, "tab {}", tab_id),
        }
    }
}

/// Identity of the context on the other side of a message or port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderInfo {
    pub context: ContextId,
}

impl SenderInfo {
    pub fn new(context: ContextId) -> Self {
        Self { context }
    }

    /// Tab id, absent for extension pages.
    pub fn tab_id(&self) -> Option<i64> {
        match self.context {
            ContextId::Tab { tab_id, .. } => Some(tab_id),
            _ => None,
        }
    }

    pub fn frame_id(&self) -> Option<i64> {
        match self.context {
            ContextId::Tab { frame_id, .. } => Some(frame_id),
            _ => None,
        }
    }
}

/// One half of a persistent connection.
///
/// Delivery is ordered. Dropping `tx` ends the peer's `rx`, which is how
/// the peer observes a disconnect.
pub struct Port {
    pub name: String,
    /// The context at the other end.
    pub peer: SenderInfo,
    pub tx: mpsc::UnboundedSender<Value>,
    pub rx: mpsc::UnboundedReceiver<Value>,
}

impl Port {
    /// Create both ends of a connection. The first port belongs to
    /// `local`, the second to `remote`.
    pub fn pair(name: &str, local: SenderInfo, remote: SenderInfo) -> (Port, Port) {
        let (local_tx, remote_rx) = mpsc::unbounded_channel();
        let (remote_tx, local_rx) = mpsc::unbounded_channel();
        (
            Port {
                name: name.to_string(),
                peer: remote,
                tx: local_tx,
                rx: local_rx,
            },
            Port {
                name: name.to_string(),
                peer: local,
                tx: remote_tx,
                rx: remote_rx,
            },
        )
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("peer", &self.peer)
            .finish()
    }
}

/// One-shot message primitive.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// The context this transport belongs to.
    fn context(&self) -> ContextId;

    /// Send a message and wait for the first listener response.
    ///
    /// Fails with [`TransportError::NoReceiver`] when nothing listens at
    /// the target.
    async fn send_message(
        &self,
        target: Target,
        message: Value,
    ) -> Result<Option<Value>, TransportError>;

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;

    fn remove_message_listener(&self, id: ListenerId) -> bool;
}

/// Persistent connection primitive.
pub trait PortTransport: Send + Sync {
    fn context(&self) -> ContextId;

    /// Open a named connection to the target context.
    fn connect(&self, name: &str, target: Target) -> Result<Port, TransportError>;

    /// Register a listener for incoming connections. Each incoming port is
    /// handed to the earliest registered listener only.
    fn add_connect_listener(&self, listener: ConnectListener) -> ListenerId;

    fn remove_connect_listener(&self, id: ListenerId) -> bool;
}
