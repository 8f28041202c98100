//! # TextLens Protocols
//!
//! Shared vocabulary for every TextLens execution context.
//! Contains only data shapes and contracts - no I/O.
//!
//! ## Contents
//!
//! - [`Event`] / [`Envelope`] - The canonical message shape exchanged between contexts
//! - [`EventPayload`] - Typed union over the event catalog
//! - [`InferenceEngine`] - Contract of the language-model runtime hosted in the background
//! - [`Settings`] - The user settings record broadcast with `SETTINGS_UPDATE`

pub mod engine;
pub mod error;
pub mod event;
pub mod settings;
pub mod types;

pub use engine::{EngineChunk, InferenceEngine, LoadProgress, ProgressCallback, TokenStream};
pub use error::{EngineError, InferenceError, ProtocolError, TransportError};
pub use event::{
    create_event, now_millis, Envelope, Event, EventPayload, EventType, DEFAULT_SOURCE,
};
pub use settings::{Settings, Theme};
pub use types::*;
