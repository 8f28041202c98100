//! # TextLens Selection
//!
//! Turns a raw page selection into model-ready input.
//!
//! ## Pipeline
//!
//! 1. Extraction - text and HTML fragment from a [`PlatformSelection`]
//! 2. Cleaning - [`clean_text`] strips UI artifacts and collapses whitespace
//! 3. Classification - [`detect_selection_types`] tags structure and content
//! 4. Formatting - [`format_for_llm`] applies the first matching formatter
//!
//! [`SelectionWatcher`] debounces live selection changes in front of the
//! pipeline.

pub mod clean;
pub mod detect;
pub mod format;
pub mod html;
pub mod pipeline;
pub mod types;
pub mod watcher;

pub use clean::{clean_text, count_words};
pub use detect::detect_selection_types;
pub use format::{format_for_llm, FormatInput, FormatRule, DEFAULT_MAX_WORDS, FORMAT_RULES};
pub use pipeline::{analyze, PipelineConfig, SelectionPipeline};
pub use types::{
    ElementInfo, PageInfo, PlatformSelection, SelectionData, SelectionSnapshot, SelectionType,
};
pub use watcher::{SelectionWatcher, WatcherConfig};
