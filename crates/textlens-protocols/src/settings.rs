//! User settings record.
//!
//! Persisted by the extension under one storage key; this crate only
//! defines its shape so it can travel inside `SETTINGS_UPDATE` events.

use serde::{Deserialize, Serialize};

/// The full settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model loaded when a request does not name one.
    pub selected_model: String,

    pub temperature: f32,

    pub top_p: f32,

    /// Open the action popup automatically after a selection.
    pub show_on_selection: bool,

    /// Anchor the popup at the mouse instead of the selection rectangle.
    #[serde(alias = "mousePosition")]
    pub mouse_position: bool,

    /// Target language for translation actions.
    pub preferred_language: String,

    pub debounce_ms: u64,

    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_model: "Llama-3.2-1B-Instruct-q4f16_1-MLC".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            show_on_selection: true,
            mouse_position: false,
            preferred_language: "English".to_string(),
            debounce_ms: 250,
            theme: Theme::System,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}
