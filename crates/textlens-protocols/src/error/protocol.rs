//! Envelope and payload decoding errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Envelope is missing the 'type' field")]
    MissingType,

    #[error("Envelope 'type' must be a string, got: {0}")]
    InvalidType(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid payload for {event_type}: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_type_error() {
        let err = ProtocolError::MissingType;
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_invalid_payload_error() {
        let err = ProtocolError::InvalidPayload {
            event_type: "INFERENCE_CHUNK".to_string(),
            reason: "missing field `token`".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("INFERENCE_CHUNK"));
        assert!(display.contains("token"));
    }

    #[test]
    fn test_invalid_type_error() {
        let err = ProtocolError::InvalidType("42".to_string());
        assert!(err.to_string().contains("42"));
    }
}
