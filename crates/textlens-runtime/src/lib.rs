//! # TextLens Runtime
//!
//! Inference coordination on both sides of the inference connection.
//!
//! ## Consumer side (popup, content scripts)
//!
//! - [`InferenceController`] - Per-request lifecycle state machine
//! - [`ModelLoader`] - Model load handshake with progress
//!
//! ## Background side
//!
//! - [`EngineSession`] - The single model engine and its loaded model
//! - [`BackgroundService`] - Serves loads, generations and stops

pub mod background;
pub mod controller;
pub mod loader;
pub mod session;

pub use background::{BackgroundConfig, BackgroundService};
pub use controller::{
    CompleteCallback, ControllerConfig, ErrorCallback, InferenceCallbacks, InferenceController,
    InferenceState, InferenceStatus, UpdateCallback,
};
pub use loader::{LoaderConfig, ModelLoader};
pub use session::EngineSession;

/// Connection name shared by all inference traffic.
pub const DEFAULT_CONNECTION_NAME: &str = "textlens-inference";
