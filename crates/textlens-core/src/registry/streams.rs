//! Stream registry keyed by connection name and sender.
//!
//! The registry is an explicit object owned by whoever composes the
//! background context. Several independent registries may coexist, which
//! is what the integration tests rely on.

use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use crate::bus::EventStream;
use crate::transport::SenderInfo;

/// Who opened a stream: a tab's content script, or the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamIdentifier {
    Tab(i64),
    Popup,
}

impl StreamIdentifier {
    /// Derive the identifier from the sender of a connection. Anything that
    /// is not a tab is treated as the popup.
    pub fn from_sender(sender: &SenderInfo) -> Self {
        match sender.tab_id() {
            Some(tab_id) => Self::Tab(tab_id),
            None => Self::Popup,
        }
    }
}

impl fmt::Display for StreamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tab(id) => write!(f, "tab-{}", id),
            Self::Popup => f.write_str("popup"),
        }
    }
}

/// Active streams per `(connection name, identifier)`.
///
/// A sender reconnecting under the same name replaces its previous entry.
pub struct StreamRegistry {
    streams: DashMap<(String, StreamIdentifier), EventStream>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
        }
    }

    /// Track a stream, returning the entry it replaced.
    pub fn insert(
        &self,
        name: &str,
        identifier: StreamIdentifier,
        stream: EventStream,
    ) -> Option<EventStream> {
        debug!("Registering stream '{}' for {}", name, identifier);
        self.streams.insert((name.to_string(), identifier), stream)
    }

    pub fn get(&self, name: &str, identifier: StreamIdentifier) -> Option<EventStream> {
        self.streams
            .get(&(name.to_string(), identifier))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, name: &str, identifier: StreamIdentifier) -> Option<EventStream> {
        self.streams
            .remove(&(name.to_string(), identifier))
            .map(|(_, stream)| stream)
    }

    /// Remove the entry only if it still refers to the given stream.
    ///
    /// A closing stream must not evict the newer stream that replaced it.
    pub fn remove_if(&self, name: &str, identifier: StreamIdentifier, stream_id: u64) -> bool {
        let removed = self
            .streams
            .remove_if(&(name.to_string(), identifier), |_, stream| {
                stream.id() == stream_id
            })
            .is_some();
        if removed {
            debug!("Unregistered stream '{}' for {}", name, identifier);
        }
        removed
    }

    /// Identifiers with an open stream under a connection name.
    pub fn streams_for(&self, name: &str) -> Vec<StreamIdentifier> {
        let mut identifiers: Vec<_> = self
            .streams
            .iter()
            .filter(|entry| entry.key().0 == name)
            .map(|entry| entry.key().1)
            .collect();
        identifiers.sort();
        identifiers
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Close and forget every tracked stream.
    pub fn close_all(&self) -> usize {
        let streams: Vec<EventStream> = self
            .streams
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.streams.clear();
        let count = streams.len();
        for stream in streams {
            stream.close();
        }
        count
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;
