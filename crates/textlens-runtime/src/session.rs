//! Model engine session owned by the background context.
//!
//! At most one model is loaded at a time. Loading is serialised, and a
//! load that fails leaves no model selected.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use textlens_protocols::{
    ChatMessage, EngineError, InferenceEngine, InferenceParameters, ProgressCallback, TokenStream,
};

pub struct EngineSession {
    engine: Arc<dyn InferenceEngine>,
    current: RwLock<Option<String>>,
    load_lock: AsyncMutex<()>,
}

impl EngineSession {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            engine,
            current: RwLock::new(None),
            load_lock: AsyncMutex::new(()),
        }
    }

    pub fn engine_id(&self) -> &str {
        self.engine.id()
    }

    /// The loaded model, if any.
    pub fn current_model(&self) -> Option<String> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.current.read().as_deref() == Some(model_id)
    }

    /// Make `model_id` the loaded model.
    ///
    /// Returns `false` without touching the engine when it is already
    /// loaded.
    pub async fn load_model(
        &self,
        model_id: &str,
        progress: ProgressCallback,
    ) -> Result<bool, EngineError> {
        let _guard = self.load_lock.lock().await;
        if self.is_loaded(model_id) {
            return Ok(false);
        }

        // The previous model is unusable from here on.
        *self.current.write() = None;
        info!("Loading model {} on engine {}", model_id, self.engine.id());
        match self.engine.load(model_id, progress).await {
            Ok(()) => {
                *self.current.write() = Some(model_id.to_string());
                info!("Model {} loaded", model_id);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to load model {}: {}", model_id, e);
                Err(e)
            }
        }
    }

    /// Start a streamed completion on the loaded model.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &InferenceParameters,
    ) -> Result<TokenStream, EngineError> {
        if self.current.read().is_none() {
            return Err(EngineError::NoModelLoaded);
        }
        self.engine.stream_chat(messages, params).await
    }

    /// Interrupt the generation in progress.
    pub async fn interrupt(&self) {
        self.engine.interrupt().await;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
