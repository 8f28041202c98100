//! Per-consumer inference lifecycle.
//!
//! ```text
//! idle --run--> loading --first chunk--> streaming --complete--> complete
//! loading|streaming --error|timeout--> error
//! any --run--> loading (previous stream torn down first)
//! complete|error --cancel|reset--> idle
//! ```
//!
//! Each request gets its own stream and a fresh `req-<uuid>` id. Events
//! are matched against the active id; anything else is stale and ignored.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use textlens_core::{EventStream, MessageBus, Subscription};
use textlens_protocols::event::{InferenceComplete, RequestAction, StopInference};
use textlens_protocols::{EventPayload, EventType, InferenceError, InferenceRequest, RequestId};

/// Called with the text of each chunk, in arrival order.
pub type UpdateCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Called once when the request completes.
pub type CompleteCallback = Arc<dyn Fn(&InferenceComplete) + Send + Sync>;

/// Called once when the request fails or times out.
pub type ErrorCallback = Arc<dyn Fn(&InferenceError) + Send + Sync>;

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Connection name of the inference stream.
    pub connection_name: String,
    /// Bound on the whole round trip.
    pub timeout: Duration,
    /// Delay between a terminal event and closing the stream.
    pub completion_grace: Duration,
    /// How long `cancel_inference` waits for the stop acknowledgement.
    pub stop_ack_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            connection_name: crate::DEFAULT_CONNECTION_NAME.to_string(),
            timeout: Duration::from_secs(600),
            completion_grace: Duration::from_millis(100),
            stop_ack_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InferenceStatus {
    #[default]
    Idle,
    Loading,
    Streaming,
    Complete,
    Error,
}

impl InferenceStatus {
    /// Waiting for chunks or a terminal event.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Observable controller state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceState {
    pub status: InferenceStatus,
    pub request_id: Option<RequestId>,
    pub error: Option<String>,
}

/// Consumer callbacks for one request.
#[derive(Clone, Default)]
pub struct InferenceCallbacks {
    on_update: Option<UpdateCallback>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl InferenceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(callback));
        self
    }

    pub fn on_complete(
        mut self,
        callback: impl Fn(&InferenceComplete) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&InferenceError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    fn update(&self, token: &str) {
        if let Some(callback) = &self.on_update {
            callback(token);
        }
    }

    fn complete(&self, payload: &InferenceComplete) {
        if let Some(callback) = &self.on_complete {
            callback(payload);
        }
    }

    fn error(&self, error: &InferenceError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }
}

struct ActiveRequest {
    request_id: RequestId,
    stream: EventStream,
    timeout: CancellationToken,
    subscriptions: Vec<Subscription>,
}

struct Shared {
    state: watch::Sender<InferenceState>,
    active: Mutex<Option<ActiveRequest>>,
}

impl Shared {
    /// Move the request to `to` if it is still the active one and has not
    /// reached a terminal state. Returns whether the event was accepted.
    fn advance(&self, request_id: &str, to: InferenceStatus, error: Option<String>) -> bool {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.request_id.as_deref() != Some(request_id) || !state.status.is_active() {
                return false;
            }
            accepted = true;
            if state.status == to {
                return false;
            }
            state.status = to;
            state.error = error;
            true
        });
        accepted
    }

    /// Close the active stream. With `request_id`, only if that request is
    /// still the active one.
    fn teardown(&self, request_id: Option<&str>) -> bool {
        let active = {
            let mut active = self.active.lock();
            match (active.as_ref(), request_id) {
                (Some(current), Some(id)) if current.request_id != id => None,
                _ => active.take(),
            }
        };
        let Some(active) = active else {
            return false;
        };

        active.timeout.cancel();
        for subscription in &active.subscriptions {
            subscription.unsubscribe();
        }
        if active.stream.close() {
            debug!("Closed stream of request {}", active.request_id);
        }
        true
    }

    fn reset_to_idle(&self, request_id: Option<&str>) {
        self.state.send_if_modified(|state| {
            if request_id.is_some() && state.request_id.as_deref() != request_id {
                return false;
            }
            if *state == InferenceState::default() {
                return false;
            }
            *state = InferenceState::default();
            true
        });
    }
}

/// Runs inference requests against the background context over a stream,
/// one request at a time.
pub struct InferenceController {
    bus: MessageBus,
    config: ControllerConfig,
    shared: Arc<Shared>,
}

impl InferenceController {
    pub fn new(bus: MessageBus, config: ControllerConfig) -> Self {
        let (state, _) = watch::channel(InferenceState::default());
        Self {
            bus,
            config,
            shared: Arc::new(Shared {
                state,
                active: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> InferenceState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<InferenceState> {
        self.shared.state.subscribe()
    }

    /// Whether a request stream is still open.
    pub fn has_open_stream(&self) -> bool {
        self.shared.active.lock().is_some()
    }

    /// Submit a request, replacing any request in flight.
    ///
    /// Returns the minted request id. Must be called from within a Tokio
    /// runtime.
    pub fn run_inference(
        &self,
        request: InferenceRequest,
        callbacks: InferenceCallbacks,
    ) -> Result<RequestId, InferenceError> {
        if self.shared.teardown(None) {
            debug!("Replaced request in flight");
        }

        let request_id = format!("req-{}", Uuid::new_v4());
        let stream = match self.bus.create_stream(&self.config.connection_name, None) {
            Ok(stream) => stream,
            Err(e) => {
                let error = InferenceError::Delivery(e.to_string());
                self.shared.state.send_replace(InferenceState {
                    status: InferenceStatus::Error,
                    request_id: Some(request_id),
                    error: Some(error.to_string()),
                });
                return Err(error);
            }
        };

        self.shared.state.send_replace(InferenceState {
            status: InferenceStatus::Loading,
            request_id: Some(request_id.clone()),
            error: None,
        });

        let timeout = CancellationToken::new();
        let subscriptions = self.register_handlers(&stream, &request_id, &callbacks, &timeout);
        *self.shared.active.lock() = Some(ActiveRequest {
            request_id: request_id.clone(),
            stream: stream.clone(),
            timeout: timeout.clone(),
            subscriptions,
        });

        let action = RequestAction::from_request(request, request_id.clone());
        if !stream.send(EventPayload::RequestAction(action)) {
            let error = InferenceError::Delivery("inference stream closed".to_string());
            self.shared
                .advance(&request_id, InferenceStatus::Error, Some(error.to_string()));
            self.shared.teardown(Some(&request_id));
            return Err(error);
        }

        self.arm_timeout(request_id.clone(), callbacks, timeout);
        info!("Inference request {} submitted", request_id);
        Ok(request_id)
    }

    /// Stop the request in flight and return to idle.
    ///
    /// Waits up to `stop_ack_timeout` for the background to acknowledge.
    /// A no-op when idle.
    pub async fn cancel_inference(&self) {
        let (request_id, stream, status) = {
            let state = self.shared.state.borrow();
            let active = self.shared.active.lock();
            (
                state.request_id.clone(),
                active.as_ref().map(|a| a.stream.clone()),
                state.status,
            )
        };

        if status == InferenceStatus::Idle && stream.is_none() {
            return;
        }

        if let (Some(id), Some(stream), true) = (&request_id, &stream, status.is_active()) {
            self.await_stop_ack(id, stream).await;
        }

        self.shared.teardown(request_id.as_deref());
        self.shared.reset_to_idle(request_id.as_deref());
        debug!("Inference cancelled");
    }

    /// Return from `complete` or `error` to `idle` without contacting the
    /// background.
    pub fn reset(&self) -> bool {
        let state = self.state();
        if !state.status.is_terminal() {
            return false;
        }
        self.shared.teardown(state.request_id.as_deref());
        self.shared.reset_to_idle(state.request_id.as_deref());
        true
    }

    async fn await_stop_ack(&self, request_id: &str, stream: &EventStream) {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let expected = request_id.to_string();
        let ack = stream.on_message(EventType::InferenceStopped, move |event| {
            if event.request_id().is_none_or(|id| id == expected) {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }
        });

        let stop = StopInference {
            request_id: Some(request_id.to_string()),
            ack: true,
        };
        if stream.send(EventPayload::StopInference(stop)) {
            if tokio::time::timeout(self.config.stop_ack_timeout, rx)
                .await
                .is_err()
            {
                warn!("No stop acknowledgement for {}", request_id);
            }
        }
        ack.unsubscribe();
    }

    fn register_handlers(
        &self,
        stream: &EventStream,
        request_id: &str,
        callbacks: &InferenceCallbacks,
        timeout: &CancellationToken,
    ) -> Vec<Subscription> {
        let grace = self.config.completion_grace;
        let mut subscriptions = Vec::with_capacity(3);

        let shared = Arc::downgrade(&self.shared);
        let id = request_id.to_string();
        let cbs = callbacks.clone();
        subscriptions.push(stream.on_message(EventType::InferenceChunk, move |event| {
            let EventPayload::InferenceChunk(chunk) = &event.payload else {
                return;
            };
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if chunk.request_id != id || !shared.advance(&id, InferenceStatus::Streaming, None) {
                debug!("Ignoring stale chunk for {}", chunk.request_id);
                return;
            }
            cbs.update(&chunk.token);
        }));

        let shared = Arc::downgrade(&self.shared);
        let id = request_id.to_string();
        let cbs = callbacks.clone();
        let token = timeout.clone();
        subscriptions.push(stream.on_message(EventType::InferenceComplete, move |event| {
            let EventPayload::InferenceComplete(complete) = &event.payload else {
                return;
            };
            let Some(strong) = shared.upgrade() else {
                return;
            };
            if complete.request_id != id || !strong.advance(&id, InferenceStatus::Complete, None) {
                debug!("Ignoring stale completion for {}", complete.request_id);
                return;
            }
            token.cancel();
            info!("Inference request {} complete", id);
            cbs.complete(complete);
            close_after(shared.clone(), id.clone(), grace);
        }));

        let shared = Arc::downgrade(&self.shared);
        let id = request_id.to_string();
        let cbs = callbacks.clone();
        let token = timeout.clone();
        subscriptions.push(stream.on_message(EventType::InferenceError, move |event| {
            let EventPayload::InferenceError(failure) = &event.payload else {
                return;
            };
            let Some(strong) = shared.upgrade() else {
                return;
            };
            let message = failure.message();
            if failure.request_id != id
                || !strong.advance(&id, InferenceStatus::Error, Some(message.clone()))
            {
                debug!("Ignoring stale error for {}", failure.request_id);
                return;
            }
            token.cancel();
            warn!("Inference request {} failed: {}", id, message);
            cbs.error(&InferenceError::Remote(message));
            close_after(shared.clone(), id.clone(), grace);
        }));

        let shared = Arc::downgrade(&self.shared);
        let id = request_id.to_string();
        let cbs = callbacks.clone();
        stream.on_close(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let still_active = shared
                .active
                .lock()
                .as_ref()
                .is_some_and(|active| active.request_id == id);
            if !still_active {
                return;
            }
            let error = InferenceError::Delivery("connection to background lost".to_string());
            if shared.advance(&id, InferenceStatus::Error, Some(error.to_string())) {
                warn!("Stream of request {} closed by peer", id);
                cbs.error(&error);
            }
            shared.teardown(Some(&id));
        });

        subscriptions
    }

    fn arm_timeout(&self, request_id: RequestId, callbacks: InferenceCallbacks, token: CancellationToken) {
        let shared = Arc::downgrade(&self.shared);
        let duration = self.config.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    let Some(shared) = shared.upgrade() else {
                        return;
                    };
                    let error = InferenceError::Timeout(duration.as_secs());
                    if shared.advance(&request_id, InferenceStatus::Error, Some(error.to_string())) {
                        warn!("Inference request {} timed out", request_id);
                        callbacks.error(&error);
                    }
                    shared.teardown(Some(&request_id));
                }
            }
        });
    }
}

impl Drop for InferenceController {
    fn drop(&mut self) {
        self.shared.teardown(None);
    }
}

fn close_after(shared: Weak<Shared>, request_id: RequestId, grace: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        if let Some(shared) = shared.upgrade() {
            shared.teardown(Some(&request_id));
        }
    });
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
