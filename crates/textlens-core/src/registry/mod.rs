//! Background-side bookkeeping of accepted streams.

mod streams;

pub use streams::{StreamIdentifier, StreamRegistry};
