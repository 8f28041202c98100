use super::*;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use textlens_protocols::{EngineChunk, LoadProgress};

struct CountingEngine {
    loads: AtomicUsize,
    interrupts: AtomicUsize,
    fail_model: Option<&'static str>,
}

impl CountingEngine {
    fn new(fail_model: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            interrupts: AtomicUsize::new(0),
            fail_model,
        })
    }
}

#[async_trait]
impl InferenceEngine for CountingEngine {
    fn id(&self) -> &str {
        "counting"
    }

    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<(), EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        progress(LoadProgress {
            progress: 1.0,
            text: "done".to_string(),
        });
        if self.fail_model == Some(model_id) {
            return Err(EngineError::LoadFailed("no weights".to_string()));
        }
        Ok(())
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        _params: &InferenceParameters,
    ) -> Result<TokenStream, EngineError> {
        let text = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(vec![Ok(EngineChunk::text(text))])))
    }

    async fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }
}

fn no_progress() -> ProgressCallback {
    Arc::new(|_: LoadProgress| {})
}

#[tokio::test]
async fn test_stream_requires_model() {
    let session = EngineSession::new(CountingEngine::new(None));
    let result = session
        .stream_chat(&[ChatMessage::user("hi")], &InferenceParameters::default())
        .await;
    assert!(matches!(result, Err(EngineError::NoModelLoaded)));
}

#[tokio::test]
async fn test_same_model_loads_once() {
    let engine = CountingEngine::new(None);
    let session = EngineSession::new(engine.clone());

    assert!(session.load_model("a", no_progress()).await.unwrap());
    assert!(!session.load_model("a", no_progress()).await.unwrap());
    assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    assert_eq!(session.current_model().as_deref(), Some("a"));

    assert!(session.load_model("b", no_progress()).await.unwrap());
    assert!(session.is_loaded("b"));
    assert!(!session.is_loaded("a"));
}

#[tokio::test]
async fn test_failed_load_clears_model() {
    let session = EngineSession::new(CountingEngine::new(Some("bad")));

    session.load_model("good", no_progress()).await.unwrap();
    let err = session.load_model("bad", no_progress()).await.unwrap_err();
    assert!(matches!(err, EngineError::LoadFailed(_)));
    assert_eq!(session.current_model(), None);
}

#[tokio::test]
async fn test_concurrent_loads_are_serialised() {
    let engine = CountingEngine::new(None);
    let session = Arc::new(EngineSession::new(engine.clone()));

    let a = session.clone();
    let b = session.clone();
    let (ra, rb) = tokio::join!(
        async move { a.load_model("m", no_progress()).await },
        async move { b.load_model("m", no_progress()).await },
    );
    assert_ne!(ra.unwrap(), rb.unwrap());
    assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stream_and_interrupt() {
    let engine = CountingEngine::new(None);
    let session = EngineSession::new(engine.clone());
    session.load_model("m", no_progress()).await.unwrap();

    let mut stream = session
        .stream_chat(&[ChatMessage::user("echo")], &InferenceParameters::default())
        .await
        .unwrap();
    let chunk = stream.next().await.unwrap().unwrap();
    assert_eq!(chunk.delta, "echo");

    session.interrupt().await;
    assert_eq!(engine.interrupts.load(Ordering::SeqCst), 1);
    assert_eq!(session.engine_id(), "counting");
}
