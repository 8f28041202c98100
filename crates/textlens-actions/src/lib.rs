//! # TextLens Actions
//!
//! The built-in action catalog and the resolver that filters it by
//! selection tags and page category.
//!
//! An [`ActionDefinition`] turns a [`SelectionData`](textlens_selection::SelectionData)
//! into an [`InferenceRequest`](textlens_protocols::InferenceRequest) via
//! [`ActionDefinition::build_request`].

pub mod catalog;
pub mod category;
pub mod definition;
pub mod error;
pub mod resolver;

pub use catalog::ActionCatalog;
pub use category::PageCategory;
pub use definition::{render, ActionDefinition, PromptVars};
pub use error::ActionError;
pub use resolver::{get_applicable_actions, prioritized};
