//! Language-model engine contract.
//!
//! The engine runs inside the background context. It is treated as an
//! opaque runtime that can load one model and stream chat completions.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::error::EngineError;
use crate::types::{ChatMessage, InferenceParameters, Usage};

/// Model download/initialisation progress.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    /// Fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Human-readable status line from the engine.
    pub text: String,
}

/// Callback invoked by the engine while a model loads.
pub type ProgressCallback = Arc<dyn Fn(LoadProgress) + Send + Sync>;

/// One increment of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineChunk {
    pub delta: String,
    /// Present on the final chunk when the engine reports usage.
    pub usage: Option<Usage>,
}

impl EngineChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            usage: None,
        }
    }
}

/// Stream of completion chunks.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<EngineChunk, EngineError>> + Send>>;

/// Core trait for model engines.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Returns the engine ID.
    fn id(&self) -> &str;

    /// Load a model, replacing any previously loaded one.
    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<(), EngineError>;

    /// Start a streaming chat completion against the loaded model.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &InferenceParameters,
    ) -> Result<TokenStream, EngineError>;

    /// Ask the engine to stop the generation in progress.
    async fn interrupt(&self);
}
