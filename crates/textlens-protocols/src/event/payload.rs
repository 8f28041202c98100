//! Payload shapes of the event catalog.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventType;
use crate::error::ProtocolError;
use crate::settings::Settings;
use crate::types::{ChatMessage, InferenceParameters, InferenceRequest, RequestId, Usage};

/// `MODEL_LOAD_REQUEST` (UI -> background).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelLoadRequest {
    pub model_id: String,
    pub request_id: RequestId,
    #[serde(default = "default_true")]
    pub use_stream: bool,
}

fn default_true() -> bool {
    true
}

/// Load state reported alongside progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Ready,
    Error,
}

/// `MODEL_LOADING_PROGRESS` (background -> UI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelLoadingProgress {
    pub request_id: RequestId,
    pub model: String,
    pub progress: f64,
    pub status: LoadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `REQUEST_ACTION` (UI -> background).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAction {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<InferenceParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub request_id: RequestId,
}

impl RequestAction {
    pub fn from_request(request: InferenceRequest, request_id: impl Into<RequestId>) -> Self {
        Self {
            messages: request.messages,
            parameters: Some(request.parameters),
            action: request.action,
            model_id: request.model_id,
            request_id: request_id.into(),
        }
    }
}

/// `INFERENCE_CHUNK` (background -> UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceChunk {
    pub request_id: RequestId,
    pub token: String,
}

/// `INFERENCE_COMPLETE` (background -> UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceComplete {
    pub request_id: RequestId,
    pub full_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// `INFERENCE_ERROR` (background -> UI).
///
/// Older senders put the text under `message` instead of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceFailure {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InferenceFailure {
    pub fn new(request_id: impl Into<RequestId>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            error: Some(error.into()),
            message: None,
        }
    }

    /// The error text, falling back across both fields.
    pub fn message(&self) -> String {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|m| !m.is_empty())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// `STOP_INFERENCE` (UI -> background).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Ask the background to answer with `INFERENCE_STOPPED`.
    #[serde(default)]
    pub ack: bool,
}

/// `INFERENCE_STOPPED` (background -> UI), acknowledges a stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceStopped {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

/// Typed union over the event catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    SettingsUpdate(Settings),
    ModelLoadRequest(ModelLoadRequest),
    ModelLoadingProgress(ModelLoadingProgress),
    RequestAction(RequestAction),
    InferenceChunk(InferenceChunk),
    InferenceComplete(InferenceComplete),
    InferenceError(InferenceFailure),
    InferenceStopped(InferenceStopped),
    StopInference(StopInference),
    /// A type outside the catalog, kept verbatim.
    Other { event_type: String, payload: Value },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::SettingsUpdate(_) => EventType::SettingsUpdate,
            Self::ModelLoadRequest(_) => EventType::ModelLoadRequest,
            Self::ModelLoadingProgress(_) => EventType::ModelLoadingProgress,
            Self::RequestAction(_) => EventType::RequestAction,
            Self::InferenceChunk(_) => EventType::InferenceChunk,
            Self::InferenceComplete(_) => EventType::InferenceComplete,
            Self::InferenceError(_) => EventType::InferenceError,
            Self::InferenceStopped(_) => EventType::InferenceStopped,
            Self::StopInference(_) => EventType::StopInference,
            Self::Other { event_type, .. } => EventType::from(event_type.as_str()),
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ModelLoadRequest(p) => Some(&p.request_id),
            Self::ModelLoadingProgress(p) => Some(&p.request_id),
            Self::RequestAction(p) => Some(&p.request_id),
            Self::InferenceChunk(p) => Some(&p.request_id),
            Self::InferenceComplete(p) => Some(&p.request_id),
            Self::InferenceError(p) => Some(&p.request_id),
            Self::InferenceStopped(p) => p.request_id.as_deref(),
            Self::StopInference(p) => p.request_id.as_deref(),
            Self::SettingsUpdate(_) => None,
            Self::Other { payload, .. } => payload.get("requestId").and_then(Value::as_str),
        }
    }

    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            Self::SettingsUpdate(p) => serde_json::to_value(p),
            Self::ModelLoadRequest(p) => serde_json::to_value(p),
            Self::ModelLoadingProgress(p) => serde_json::to_value(p),
            Self::RequestAction(p) => serde_json::to_value(p),
            Self::InferenceChunk(p) => serde_json::to_value(p),
            Self::InferenceComplete(p) => serde_json::to_value(p),
            Self::InferenceError(p) => serde_json::to_value(p),
            Self::InferenceStopped(p) => serde_json::to_value(p),
            Self::StopInference(p) => serde_json::to_value(p),
            Self::Other { payload, .. } => Ok(payload.clone()),
        };
        value.map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode a payload for the given type string.
    ///
    /// Unknown types never fail; a known type whose payload does not match
    /// its shape is reported as [`ProtocolError::InvalidPayload`].
    pub fn decode(event_type: &str, payload: Value) -> Result<Self, ProtocolError> {
        let kind = EventType::from(event_type);
        Ok(match kind {
            EventType::SettingsUpdate => Self::SettingsUpdate(typed(event_type, payload)?),
            EventType::ModelLoadRequest => Self::ModelLoadRequest(typed(event_type, payload)?),
            EventType::ModelLoadingProgress => {
                Self::ModelLoadingProgress(typed(event_type, payload)?)
            }
            EventType::RequestAction => Self::RequestAction(typed(event_type, payload)?),
            EventType::InferenceChunk => Self::InferenceChunk(typed(event_type, payload)?),
            EventType::InferenceComplete => Self::InferenceComplete(typed(event_type, payload)?),
            EventType::InferenceError => Self::InferenceError(typed(event_type, payload)?),
            EventType::InferenceStopped => Self::InferenceStopped(typed(event_type, payload)?),
            EventType::StopInference => Self::StopInference(typed(event_type, payload)?),
            EventType::Custom(name) => Self::Other {
                event_type: name,
                payload,
            },
        })
    }
}

fn typed<T: DeserializeOwned>(event_type: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}
