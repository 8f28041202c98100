//! Adapter types for TextLens.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use textlens_protocols::{
    ChatMessage, ChatRole, EngineChunk, EngineError, InferenceEngine, InferenceParameters,
    LoadProgress, ProgressCallback, TokenStream, Usage,
};

/// Engine that streams the last user message back word by word.
///
/// Stands in for the in-browser model runtime so the whole inference
/// path can be driven from the command line.
pub(crate) struct EchoEngine {
    token_delay: Duration,
    /// Bumped by `interrupt`; a stream stops once it no longer matches.
    generation: Arc<AtomicU64>,
}

impl EchoEngine {
    pub fn new(token_delay: Duration) -> Self {
        Self {
            token_delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Split text into tokens that concatenate back to the original.
pub(crate) fn echo_tokens(text: &str) -> Vec<String> {
    text.split_inclusive(char::is_whitespace)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl InferenceEngine for EchoEngine {
    fn id(&self) -> &str {
        "echo"
    }

    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<(), EngineError> {
        if model_id.trim().is_empty() {
            return Err(EngineError::ModelNotFound(model_id.to_string()));
        }
        for step in 1..=4u32 {
            tokio::time::sleep(self.token_delay).await;
            progress(LoadProgress {
                progress: f64::from(step) / 4.0,
                text: format!("Loading {} ({}/4)", model_id, step),
            });
        }
        Ok(())
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        _params: &InferenceParameters,
    ) -> Result<TokenStream, EngineError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .ok_or_else(|| EngineError::GenerationFailed("no user message".to_string()))?;

        let prompt_tokens: usize = messages.iter().map(|m| echo_tokens(&m.content).len()).sum();
        let tokens = echo_tokens(&prompt);
        let completion_tokens = tokens.len();
        debug!("Echoing {} token(s)", completion_tokens);

        let delay = self.token_delay;
        let generation = self.generation.clone();
        let started = generation.load(Ordering::SeqCst);
        let chunks = futures::stream::iter(tokens)
            .then(move |token| async move {
                tokio::time::sleep(delay).await;
                EngineChunk::text(token)
            })
            .take_while(move |_| {
                let current = generation.load(Ordering::SeqCst) == started;
                async move { current }
            })
            .map(Ok);

        let usage = Usage::new(prompt_tokens as u32, completion_tokens as u32);
        let tail = futures::stream::once(async move {
            Ok(EngineChunk {
                delta: String::new(),
                usage: Some(usage),
            })
        });
        Ok(Box::pin(chunks.chain(tail)))
    }

    async fn interrupt(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
