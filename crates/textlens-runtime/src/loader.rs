//! Consumer-side model loading.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use textlens_core::MessageBus;
use textlens_protocols::event::{LoadStatus, ModelLoadRequest, ModelLoadingProgress};
use textlens_protocols::{EventPayload, EventType, InferenceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub connection_name: String,
    /// Bound on the load handshake, shorter than the inference timeout.
    pub load_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            connection_name: crate::DEFAULT_CONNECTION_NAME.to_string(),
            load_timeout: Duration::from_secs(120),
        }
    }
}

type Outcome = Result<(), InferenceError>;

/// Asks the background to load a model and follows its progress.
pub struct ModelLoader {
    bus: MessageBus,
    config: LoaderConfig,
}

impl ModelLoader {
    pub fn new(bus: MessageBus, config: LoaderConfig) -> Self {
        Self { bus, config }
    }

    /// Load a model, reporting each progress event.
    ///
    /// Resolves once the background reports `ready`; fails on an error
    /// status, an `INFERENCE_ERROR` for this load, a dropped connection, or
    /// when the load timeout elapses.
    pub async fn load_model<F>(&self, model_id: &str, on_progress: F) -> Result<(), InferenceError>
    where
        F: Fn(&ModelLoadingProgress) + Send + Sync + 'static,
    {
        let stream = self
            .bus
            .create_stream(&self.config.connection_name, None)
            .map_err(|e| InferenceError::Delivery(e.to_string()))?;
        let request_id = format!("load-{}", Uuid::new_v4());
        let (tx, rx) = oneshot::channel::<Outcome>();
        let finish = Arc::new(Mutex::new(Some(tx)));

        let done = finish.clone();
        let id = request_id.clone();
        stream.on_message(EventType::ModelLoadingProgress, move |event| {
            let EventPayload::ModelLoadingProgress(progress) = &event.payload else {
                return;
            };
            if progress.request_id != id {
                return;
            }
            on_progress(progress);
            let outcome = match progress.status {
                LoadStatus::Loading => return,
                LoadStatus::Ready => Ok(()),
                LoadStatus::Error => Err(InferenceError::Remote(
                    progress
                        .text
                        .clone()
                        .unwrap_or_else(|| "Model load failed".to_string()),
                )),
            };
            resolve(&done, outcome);
        });

        let done = finish.clone();
        let id = request_id.clone();
        stream.on_message(EventType::InferenceError, move |event| {
            if let EventPayload::InferenceError(failure) = &event.payload {
                if failure.request_id == id {
                    resolve(&done, Err(InferenceError::Remote(failure.message())));
                }
            }
        });

        let done = finish.clone();
        stream.on_close(move || {
            resolve(
                &done,
                Err(InferenceError::Delivery("connection to background lost".to_string())),
            );
        });

        info!("Requesting model load: {}", model_id);
        let sent = stream.send(EventPayload::ModelLoadRequest(ModelLoadRequest {
            model_id: model_id.to_string(),
            request_id: request_id.clone(),
            use_stream: true,
        }));
        if !sent {
            stream.close();
            return Err(InferenceError::Delivery("inference stream closed".to_string()));
        }

        let result = match tokio::time::timeout(self.config.load_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(InferenceError::Delivery("load abandoned".to_string())),
            Err(_) => {
                warn!("Model load {} timed out", request_id);
                Err(InferenceError::Timeout(self.config.load_timeout.as_secs()))
            }
        };
        stream.close();

        match &result {
            Ok(()) => info!("Model ready: {}", model_id),
            Err(e) => debug!("Model load {} failed: {}", request_id, e),
        }
        result
    }
}

fn resolve(slot: &Mutex<Option<oneshot::Sender<Outcome>>>, outcome: Outcome) {
    if let Some(tx) = slot.lock().take() {
        let _ = tx.send(outcome);
    }
}
