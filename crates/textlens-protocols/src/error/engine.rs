//! Model engine errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("No model loaded")]
    NoModelLoaded,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generation interrupted")]
    Interrupted,
}
