//! Consumer-side inference errors.

use thiserror::Error;

use super::EngineError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error reported by the background context.
    #[error("{0}")]
    Remote(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let err = InferenceError::Timeout(600);
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn test_remote_error_is_verbatim() {
        let err = InferenceError::Remote("Model crashed".to_string());
        assert_eq!(err.to_string(), "Model crashed");
    }

    #[test]
    fn test_from_engine_error() {
        let err: InferenceError = EngineError::NoModelLoaded.into();
        assert!(matches!(err, InferenceError::Engine(EngineError::NoModelLoaded)));
    }
}
