//! # TextLens Config
//!
//! TOML configuration for the TextLens composition root, with `${VAR}`
//! substitution, validation, and conversion into component configs.

mod convert;
mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
