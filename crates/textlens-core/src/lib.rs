//! # TextLens Core
//!
//! Messaging layer shared by every execution context.
//!
//! ## Components
//!
//! - [`transport`] - Low-level primitives: one-shot messages and persistent ports,
//!   plus the in-process [`MemoryHub`] that routes between contexts
//! - [`MessageBus`] - Typed pub/sub and stream multiplexing on top of a transport
//! - [`EventStream`] - A persistent connection with per-event-type dispatch
//! - [`StreamRegistry`] - Bookkeeping of accepted streams per connection name and sender

pub mod bus;
pub mod registry;
pub mod transport;

pub use bus::{
    BusError, ConnectHandler, EventStream, HandlerError, HandlerResult, MessageBus,
    MessageHandler, StreamHandler, Subscription,
};
pub use registry::{StreamIdentifier, StreamRegistry};
pub use transport::{
    ContextId, ContextTransport, MemoryHub, MessageTransport, Port, PortTransport, SenderInfo,
    Target,
};
