//! Action errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown page category: {0}")]
    UnknownCategory(String),

    #[error("Action {action} does not apply to this selection")]
    NotApplicable { action: String },
}
