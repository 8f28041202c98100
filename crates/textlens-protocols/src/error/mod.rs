//! Error types for the TextLens protocol layer.

mod engine;
mod inference;
mod protocol;
mod transport;

pub use engine::*;
pub use inference::*;
pub use protocol::*;
pub use transport::*;
