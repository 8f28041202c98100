//! Sampling parameters.

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default = "default_stream")]
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_stream() -> bool {
    true
}

impl Default for InferenceParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stream: default_stream(),
            max_tokens: None,
        }
    }
}

impl InferenceParameters {
    /// Apply per-action overrides on top of these parameters.
    pub fn merged(&self, overrides: &ParamOverrides) -> Self {
        Self {
            temperature: overrides.temperature.unwrap_or(self.temperature),
            top_p: overrides.top_p.unwrap_or(self.top_p),
            presence_penalty: overrides.presence_penalty.unwrap_or(self.presence_penalty),
            frequency_penalty: overrides.frequency_penalty.unwrap_or(self.frequency_penalty),
            stream: self.stream,
            max_tokens: overrides.max_tokens.or(self.max_tokens),
        }
    }
}

/// Partial parameter set; `None` keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ParamOverrides {
    pub fn temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = InferenceParameters::default();
        assert_eq!(params.temperature, 0.7);
        assert_eq!(params.top_p, 0.95);
        assert!(params.stream);
        assert!(params.max_tokens.is_none());
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = InferenceParameters::default();
        let merged = base.merged(&ParamOverrides {
            temperature: Some(0.2),
            max_tokens: Some(256),
            ..ParamOverrides::default()
        });
        assert_eq!(merged.temperature, 0.2);
        assert_eq!(merged.top_p, 0.95);
        assert_eq!(merged.max_tokens, Some(256));
    }

    #[test]
    fn test_deserialize_partial() {
        let params: InferenceParameters = serde_json::from_str(r#"{"temperature":0.1}"#).unwrap();
        assert_eq!(params.temperature, 0.1);
        assert_eq!(params.top_p, 0.95);
        assert!(params.stream);
    }
}
