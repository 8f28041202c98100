//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use textlens_protocols::Settings;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    /// Initial settings record, broadcast with `SETTINGS_UPDATE`.
    #[serde(default)]
    pub settings: Settings,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rotated log files; console only when unset.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Inference connection and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_connection_name")]
    pub connection_name: String,

    /// Bound on a whole inference round trip.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bound on the model load handshake.
    #[serde(default = "default_load_timeout")]
    pub load_timeout_seconds: u64,

    #[serde(default = "default_completion_grace")]
    pub completion_grace_ms: u64,

    #[serde(default = "default_stop_ack_timeout")]
    pub stop_ack_timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            connection_name: default_connection_name(),
            timeout_seconds: default_timeout(),
            load_timeout_seconds: default_load_timeout(),
            completion_grace_ms: default_completion_grace(),
            stop_ack_timeout_ms: default_stop_ack_timeout(),
        }
    }
}

fn default_connection_name() -> String {
    textlens_runtime::DEFAULT_CONNECTION_NAME.to_string()
}

fn default_timeout() -> u64 {
    600
}

fn default_load_timeout() -> u64 {
    120
}

fn default_completion_grace() -> u64 {
    100
}

fn default_stop_ack_timeout() -> u64 {
    2000
}

/// Model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model loaded when neither the request nor the settings name one.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
        }
    }
}

fn default_model() -> String {
    Settings::default().selected_model
}

/// Selection pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Word ceiling for long text.
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            max_words: default_max_words(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_debounce() -> u64 {
    250
}

fn default_max_words() -> usize {
    textlens_selection::DEFAULT_MAX_WORDS
}

fn default_min_chars() -> usize {
    1
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
