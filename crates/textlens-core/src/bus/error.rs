//! Bus errors.

use thiserror::Error;

use textlens_protocols::{ProtocolError, TransportError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    /// The underlying channel reported no receiver or the peer is gone.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Stream closed")]
    StreamClosed,
}

impl From<TransportError> for BusError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Serialization(msg) => Self::Serialization(msg),
            TransportError::Disconnected => Self::StreamClosed,
            other => Self::Delivery(other.to_string()),
        }
    }
}

impl From<ProtocolError> for BusError {
    fn from(err: ProtocolError) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failure reported by a subscriber; logged and isolated by the bus.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
