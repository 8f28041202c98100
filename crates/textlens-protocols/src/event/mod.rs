//! Event envelope and catalog.
//!
//! Every message between contexts is an [`Envelope`]: `{type, payload,
//! source, timestamp}`. The `type` string selects the payload shape via
//! [`EventPayload`]; unknown types are kept as [`EventPayload::Other`]
//! so newer senders never break older receivers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

mod payload;

pub use payload::*;

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

/// Source stamped on events created without an explicit one.
pub const DEFAULT_SOURCE: &str = "unknown";

/// Event type discriminator.
///
/// Serialises as the catalog's `SCREAMING_SNAKE_CASE` string; any other
/// string round-trips through [`EventType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    SettingsUpdate,
    ModelLoadRequest,
    ModelLoadingProgress,
    RequestAction,
    InferenceChunk,
    InferenceComplete,
    InferenceError,
    InferenceStopped,
    StopInference,
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SettingsUpdate => "SETTINGS_UPDATE",
            Self::ModelLoadRequest => "MODEL_LOAD_REQUEST",
            Self::ModelLoadingProgress => "MODEL_LOADING_PROGRESS",
            Self::RequestAction => "REQUEST_ACTION",
            Self::InferenceChunk => "INFERENCE_CHUNK",
            Self::InferenceComplete => "INFERENCE_COMPLETE",
            Self::InferenceError => "INFERENCE_ERROR",
            Self::InferenceStopped => "INFERENCE_STOPPED",
            Self::StopInference => "STOP_INFERENCE",
            Self::Custom(name) => name,
        }
    }

    /// Whether the type belongs to the built-in catalog.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "SETTINGS_UPDATE" => Self::SettingsUpdate,
            "MODEL_LOAD_REQUEST" => Self::ModelLoadRequest,
            "MODEL_LOADING_PROGRESS" => Self::ModelLoadingProgress,
            "REQUEST_ACTION" => Self::RequestAction,
            "INFERENCE_CHUNK" => Self::InferenceChunk,
            "INFERENCE_COMPLETE" => Self::InferenceComplete,
            "INFERENCE_ERROR" => Self::InferenceError,
            "INFERENCE_STOPPED" => Self::InferenceStopped,
            "STOP_INFERENCE" => Self::StopInference,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

/// Wire form of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default)]
    pub timestamp: i64,
}

impl Envelope {
    /// Decode an envelope from a raw transport value.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value.get("type") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingType),
            Some(Value::String(_)) => {}
            Some(other) => return Err(ProtocolError::InvalidType(other.to_string())),
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))
    }

    pub fn into_value(self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

/// A typed event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub payload: EventPayload,
    pub source: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Correlation id carried by the payload, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.payload.request_id()
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        Ok(Envelope {
            event_type: self.event_type().to_string(),
            payload: self.payload.to_value()?,
            source: self.source.clone(),
            timestamp: self.timestamp,
        })
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let payload = EventPayload::decode(&envelope.event_type, envelope.payload)?;
        Ok(Self {
            payload,
            source: envelope.source,
            timestamp: envelope.timestamp,
        })
    }

    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        self.to_envelope()?.into_value()
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Self::from_envelope(Envelope::from_value(value)?)
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wrap a payload in an event stamped with the current time.
pub fn create_event(payload: EventPayload, source: Option<&str>) -> Event {
    Event {
        payload,
        source: source.unwrap_or(DEFAULT_SOURCE).to_string(),
        timestamp: now_millis(),
    }
}
