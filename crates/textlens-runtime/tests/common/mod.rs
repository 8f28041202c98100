//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use textlens_core::{ContextId, MemoryHub, MessageBus};
use textlens_protocols::{
    ChatMessage, EngineChunk, EngineError, InferenceEngine, InferenceParameters, LoadProgress,
    ProgressCallback, TokenStream, Usage,
};
use textlens_runtime::{
    BackgroundConfig, BackgroundService, ControllerConfig, EngineSession, InferenceController,
    InferenceState, InferenceStatus,
};

/// Engine replaying a fixed token script.
pub struct ScriptedEngine {
    pub tokens: Vec<String>,
    pub token_delay: Duration,
    pub fail_load: bool,
    pub fail_after: Option<usize>,
    pub hang: bool,
    pub loads: Mutex<Vec<String>>,
    pub interrupts: AtomicUsize,
    /// Bumped by `interrupt`; streams end once it moves past their start.
    pub generation: Arc<AtomicU64>,
}

impl ScriptedEngine {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            token_delay: Duration::from_millis(1),
            fail_load: false,
            fail_after: None,
            hang: false,
            loads: Mutex::new(Vec::new()),
            interrupts: AtomicUsize::new(0),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_after(mut self, tokens: usize) -> Self {
        self.fail_after = Some(tokens);
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loads.lock().clone()
    }

    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<(), EngineError> {
        self.loads.lock().push(model_id.to_string());
        progress(LoadProgress {
            progress: 0.5,
            text: "Fetching weights".to_string(),
        });
        if self.fail_load {
            return Err(EngineError::LoadFailed("weights unavailable".to_string()));
        }
        Ok(())
    }

    async fn stream_chat(
        &self,
        _messages: &[ChatMessage],
        _params: &InferenceParameters,
    ) -> Result<TokenStream, EngineError> {
        if self.hang {
            return Ok(Box::pin(futures::stream::pending::<Result<EngineChunk, EngineError>>()));
        }

        let delay = self.token_delay;
        let count = self.fail_after.unwrap_or(self.tokens.len()).min(self.tokens.len());
        let tokens: Vec<String> = self.tokens.iter().take(count).cloned().collect();
        let generation = self.generation.clone();
        let started = generation.load(Ordering::SeqCst);
        let chunks = futures::stream::iter(tokens)
            .then(move |token| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, EngineError>(EngineChunk::text(token))
            })
            .take_while(move |_| {
                let live = generation.load(Ordering::SeqCst) == started;
                async move { live }
            });

        let tail: Result<EngineChunk, EngineError> = if self.fail_after.is_some() {
            Err(EngineError::GenerationFailed("GPU device lost".to_string()))
        } else {
            Ok(EngineChunk {
                delta: String::new(),
                usage: Some(Usage::new(4, count as u32)),
            })
        };
        Ok(Box::pin(chunks.chain(futures::stream::once(async move { tail }))))
    }

    async fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// A hub with a started background service.
pub struct Harness {
    pub hub: MemoryHub,
    pub engine: Arc<ScriptedEngine>,
    pub background: BackgroundService,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        let hub = MemoryHub::new();
        let engine = Arc::new(engine);
        let bus = MessageBus::new(hub.context(ContextId::Background), "background");
        let session = Arc::new(EngineSession::new(engine.clone()));
        let background = BackgroundService::new(bus, session, BackgroundConfig::default());
        background.start();
        Self {
            hub,
            engine,
            background,
        }
    }

    pub fn bus(&self, context: ContextId, source: &str) -> MessageBus {
        MessageBus::new(self.hub.context(context), source)
    }

    pub fn controller(&self, context: ContextId) -> InferenceController {
        self.controller_with(context, ControllerConfig::default())
    }

    pub fn controller_with(&self, context: ContextId, config: ControllerConfig) -> InferenceController {
        InferenceController::new(self.bus(context, "consumer"), config)
    }
}

pub async fn wait_for_status(controller: &InferenceController, status: InferenceStatus) -> InferenceState {
    let mut rx = controller.watch_state();
    let state = tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|s| s.status == status))
        .await
        .expect("status not reached in time")
        .expect("controller dropped");
    state.clone()
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(120), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
