//! Inference request as composed by a UI consumer.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, InferenceParameters};

/// A request for one streamed inference.
///
/// The request id is not part of this type: it is minted by the
/// lifecycle controller when the request is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub parameters: InferenceParameters,

    /// Id of the catalog action that produced this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Model to run; the background falls back to the selected model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl InferenceRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            parameters: InferenceParameters::default(),
            action: None,
            model_id: None,
        }
    }

    pub fn with_parameters(mut self, parameters: InferenceParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}
