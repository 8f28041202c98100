//! Background composition root.
//!
//! [`BackgroundService`] owns the engine session and serves the inference
//! connection: model loads, generations and stops. Loads and generations
//! run one at a time behind a job lock; stops bypass it so they can
//! interrupt the job holding it.

use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use textlens_core::{EventStream, HandlerError, MessageBus, StreamIdentifier, Subscription};
use textlens_protocols::event::{
    InferenceChunk, InferenceComplete, InferenceFailure, InferenceStopped, LoadStatus,
    ModelLoadRequest, ModelLoadingProgress, RequestAction, StopInference,
};
use textlens_protocols::{
    EventPayload, EventType, LoadProgress, ProgressCallback, RequestId, Settings, Usage,
};

use crate::session::EngineSession;

#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    pub connection_name: String,
    /// Model used when neither the request nor the settings name one.
    pub default_model: String,
    /// Settings in effect until the first `SETTINGS_UPDATE`.
    pub settings: Settings,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            connection_name: crate::DEFAULT_CONNECTION_NAME.to_string(),
            default_model: settings.selected_model.clone(),
            settings,
        }
    }
}

struct ActiveJob {
    /// Stream the request arrived on; stop acknowledgements go back here.
    stream: EventStream,
    token: CancellationToken,
}

struct Inner {
    bus: MessageBus,
    session: Arc<EngineSession>,
    config: BackgroundConfig,
    settings: RwLock<Settings>,
    jobs: AsyncMutex<()>,
    active_jobs: DashMap<RequestId, ActiveJob>,
}

/// Serves inference requests from popup and content scripts.
pub struct BackgroundService {
    inner: Arc<Inner>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl BackgroundService {
    pub fn new(bus: MessageBus, session: Arc<EngineSession>, config: BackgroundConfig) -> Self {
        let settings = RwLock::new(config.settings.clone());
        Self {
            inner: Arc::new(Inner {
                bus,
                session,
                config,
                settings,
                jobs: AsyncMutex::new(()),
                active_jobs: DashMap::new(),
            }),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Start accepting streams and one-shot messages. Idempotent.
    pub fn start(&self) {
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            return;
        }

        let inner = self.inner.clone();
        subscriptions.push(self.inner.bus.listen_for_streams(
            &self.inner.config.connection_name,
            move |stream, identifier| inner.attach(stream, identifier),
        ));

        let inner = self.inner.clone();
        subscriptions.push(self.inner.bus.subscribe(
            EventType::SettingsUpdate,
            move |event, _| {
                let EventPayload::SettingsUpdate(settings) = &event.payload else {
                    return Ok(None);
                };
                *inner.settings.write() = settings.clone();
                debug!("Settings updated, model {}", settings.selected_model);
                serde_json::to_value(settings)
                    .map(Some)
                    .map_err(|e| HandlerError::new(e.to_string()))
            },
        ));

        let inner = self.inner.clone();
        subscriptions.push(self.inner.bus.subscribe(
            EventType::StopInference,
            move |event, _| {
                let EventPayload::StopInference(stop) = &event.payload else {
                    return Ok(None);
                };
                let stopped = inner.stop_from_message(stop);
                Ok(Some(json!({ "stopped": stopped })))
            },
        ));

        info!(
            "Background service listening on '{}'",
            self.inner.config.connection_name
        );
    }

    /// Stop accepting new work, cancel running jobs and close every
    /// accepted stream.
    pub fn shutdown(&self) {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
        for job in self.inner.active_jobs.iter() {
            job.token.cancel();
        }
        let closed = self.inner.bus.registry().close_all();
        info!("Background service stopped, closed {} stream(s)", closed);
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    pub fn session(&self) -> &Arc<EngineSession> {
        &self.inner.session
    }

    /// Request ids of jobs queued or running.
    pub fn active_jobs(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self
            .inner
            .active_jobs
            .iter()
            .map(|job| job.key().clone())
            .collect();
        ids.sort();
        ids
    }
}

impl Drop for BackgroundService {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.unsubscribe();
        }
    }
}

impl Inner {
    fn attach(self: &Arc<Self>, stream: EventStream, identifier: StreamIdentifier) {
        debug!("Accepted '{}' from {}", stream.name(), identifier);

        let inner = self.clone();
        let server = stream.clone();
        stream.on_message(EventType::ModelLoadRequest, move |event| {
            if let EventPayload::ModelLoadRequest(request) = &event.payload {
                tokio::spawn(inner.clone().handle_load(server.clone(), request.clone()));
            }
        });

        let inner = self.clone();
        let server = stream.clone();
        stream.on_message(EventType::RequestAction, move |event| {
            if let EventPayload::RequestAction(action) = &event.payload {
                inner.enqueue_action(server.clone(), identifier, action.clone());
            }
        });

        let inner = self.clone();
        let server = stream.clone();
        stream.on_message(EventType::StopInference, move |event| {
            if let EventPayload::StopInference(stop) = &event.payload {
                inner.stop(stop.request_id.as_deref());
                if stop.ack {
                    server.send(EventPayload::InferenceStopped(InferenceStopped {
                        request_id: stop.request_id.clone(),
                    }));
                }
            }
        });

        // Work for a closed stream has nobody to report to.
        let inner = Arc::downgrade(self);
        let stream_id = stream.id();
        stream.on_close(move || {
            if let Some(inner) = inner.upgrade() {
                for job in inner.active_jobs.iter() {
                    if job.stream.id() == stream_id {
                        debug!("Cancelling {} after disconnect", job.key());
                        job.token.cancel();
                    }
                }
            }
        });
    }

    /// Cancel one job, or every job when `request_id` is `None`.
    ///
    /// Only the token is cancelled. The job holding the engine interrupts
    /// it itself before releasing the job lock; queued jobs never touch it.
    fn stop(&self, request_id: Option<&str>) -> Vec<EventStream> {
        let mut stopped = Vec::new();
        for job in self.active_jobs.iter() {
            if request_id.is_none_or(|id| id == job.key().as_str()) && !job.token.is_cancelled() {
                job.token.cancel();
                stopped.push(job.stream.clone());
            }
        }
        if !stopped.is_empty() {
            info!("Stopping {} job(s)", stopped.len());
        }
        stopped
    }

    /// One-shot stop: acknowledge on the stream each job arrived on.
    fn stop_from_message(&self, stop: &StopInference) -> usize {
        let streams = self.stop(stop.request_id.as_deref());
        if stop.ack {
            for stream in &streams {
                stream.send(EventPayload::InferenceStopped(InferenceStopped {
                    request_id: stop.request_id.clone(),
                }));
            }
        }
        streams.len()
    }

    fn model_for(&self, requested: Option<&str>) -> String {
        if let Some(model) = requested.filter(|m| !m.is_empty()) {
            return model.to_string();
        }
        let selected = self.settings.read().selected_model.clone();
        if selected.is_empty() {
            self.config.default_model.clone()
        } else {
            selected
        }
    }

    async fn handle_load(self: Arc<Self>, stream: EventStream, request: ModelLoadRequest) {
        let _job = self.jobs.lock().await;
        let model = self.model_for(Some(request.model_id.as_str()));
        let progress = progress_reporter(&stream, &request.request_id, &model, request.use_stream);

        let report = |status: LoadStatus, progress: f64, text: String| {
            stream.send(EventPayload::ModelLoadingProgress(ModelLoadingProgress {
                request_id: request.request_id.clone(),
                model: model.clone(),
                progress,
                status,
                text: Some(text),
            }));
        };

        match self.session.load_model(&model, progress).await {
            Ok(_) => report(LoadStatus::Ready, 1.0, "Model loaded".to_string()),
            Err(e) => report(LoadStatus::Error, 0.0, e.to_string()),
        }
    }

    fn enqueue_action(
        self: &Arc<Self>,
        stream: EventStream,
        identifier: StreamIdentifier,
        action: RequestAction,
    ) {
        debug!("Queued {} from {}", action.request_id, identifier);
        let token = CancellationToken::new();
        self.active_jobs.insert(
            action.request_id.clone(),
            ActiveJob {
                stream: stream.clone(),
                token: token.clone(),
            },
        );

        let inner = self.clone();
        tokio::spawn(async move {
            let request_id = action.request_id.clone();
            inner.run_action(&stream, action, token).await;
            inner.active_jobs.remove(&request_id);
        });
    }

    async fn run_action(&self, stream: &EventStream, action: RequestAction, token: CancellationToken) {
        let _job = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Job {} stopped before it started", action.request_id);
                return;
            }
            guard = self.jobs.lock() => guard,
        };

        let request_id = action.request_id.clone();
        let fail = |message: String| {
            warn!("Job {} failed: {}", request_id, message);
            stream.send(EventPayload::InferenceError(InferenceFailure::new(
                request_id.clone(),
                message,
            )));
        };

        let model = self.model_for(action.model_id.as_deref());
        if !self.session.is_loaded(&model) {
            let progress = progress_reporter(stream, &request_id, &model, true);
            if let Err(e) = self.session.load_model(&model, progress).await {
                fail(e.to_string());
                return;
            }
        }
        if token.is_cancelled() {
            debug!("Job {} stopped after model load", request_id);
            return;
        }

        let params = action.parameters.clone().unwrap_or_default();
        let mut tokens = match self.session.stream_chat(&action.messages, &params).await {
            Ok(tokens) => tokens,
            Err(e) => {
                fail(e.to_string());
                return;
            }
        };

        let mut full_response = String::new();
        let mut usage: Option<Usage> = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Job {} interrupted", request_id);
                    self.session.interrupt().await;
                    return;
                }
                next = tokens.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    if chunk.delta.is_empty() {
                        continue;
                    }
                    full_response.push_str(&chunk.delta);
                    let sent = stream.send(EventPayload::InferenceChunk(InferenceChunk {
                        request_id: request_id.clone(),
                        token: chunk.delta,
                    }));
                    if !sent {
                        debug!("Requester of {} is gone, interrupting", request_id);
                        self.session.interrupt().await;
                        return;
                    }
                }
                Some(Err(e)) => {
                    error!("Generation for {} failed: {}", request_id, e);
                    fail(e.to_string());
                    return;
                }
                None => break,
            }
        }

        info!(
            "Job {} complete ({} chars)",
            request_id,
            full_response.len()
        );
        stream.send(EventPayload::InferenceComplete(InferenceComplete {
            request_id,
            full_response,
            usage,
        }));
    }
}

/// Progress callback forwarding engine progress as `MODEL_LOADING_PROGRESS`.
fn progress_reporter(
    stream: &EventStream,
    request_id: &str,
    model: &str,
    enabled: bool,
) -> ProgressCallback {
    let stream = stream.clone();
    let request_id = request_id.to_string();
    let model = model.to_string();
    Arc::new(move |progress: LoadProgress| {
        if !enabled {
            return;
        }
        stream.send(EventPayload::ModelLoadingProgress(ModelLoadingProgress {
            request_id: request_id.clone(),
            model: model.clone(),
            progress: progress.progress.clamp(0.0, 1.0),
            status: LoadStatus::Loading,
            text: Some(progress.text),
        }));
    })
}
