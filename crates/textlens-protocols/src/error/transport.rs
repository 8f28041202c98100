//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// No listener exists at the target context.
    #[error("Could not establish connection. Receiving end does not exist: {0}")]
    NoReceiver(String),

    #[error("Port disconnected")]
    Disconnected,

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_receiver_error() {
        let err = TransportError::NoReceiver("tab 7".to_string());
        let display = err.to_string();
        assert!(display.contains("Receiving end does not exist"));
        assert!(display.contains("tab 7"));
    }

    #[test]
    fn test_disconnected_error() {
        assert!(TransportError::Disconnected.to_string().contains("disconnected"));
    }
}
