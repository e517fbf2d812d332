//! Retained message store: latest payload per topic.

use ahash::AHashMap;
use bytes::Bytes;

/// Maps a topic to the most recent payload published with RETAIN=1.
///
/// An empty retained payload deletes the entry, so the store never holds an
/// empty payload.
#[derive(Default)]
pub struct RetainedStore {
    map: AHashMap<String, Bytes>,
}

impl RetainedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the retain semantics of an inbound PUBLISH with RETAIN=1.
    pub fn apply(&mut self, topic: &str, payload: &Bytes) {
        if payload.is_empty() {
            self.map.remove(topic);
        } else {
            self.map.insert(topic.to_string(), payload.clone());
        }
    }

    pub fn get(&self, topic: &str) -> Option<&Bytes> {
        self.map.get(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bytes)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
