//! Core types used across TextLens contexts.

mod common;
mod message;
mod params;
mod request;

pub use common::*;
pub use message::*;
pub use params::*;
pub use request::*;
