//! Flat subscription index.
//!
//! Every subscription is one `(session token, filter, granted QoS)` entry in
//! a flat list that is scanned on each delivered PUBLISH. At the target
//! scale (tens of clients) the scan beats a trie on simplicity, and it makes
//! the cleanup invariant trivial: removing a session is one `retain` pass.
//!
//! A session holding overlapping filters (say `a/+` and `a/#`) receives a
//! matching message once per matching entry. That duplicate delivery is
//! accepted behavior, not a defect.

use mio::Token;

use crate::packet::QoS;
use crate::topic;

/// One subscription held by one session.
#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    pub token: Token,
    pub filter: String,
    pub qos: QoS,
}

/// The broker-wide subscription index.
#[derive(Default)]
pub struct SubscriptionIndex {
    entries: Vec<SubscriptionEntry>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription. Re-subscribing to an identical filter replaces
    /// the granted QoS instead of appending a second entry.
    pub fn subscribe(&mut self, token: Token, filter: &str, qos: QoS) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.token == token && e.filter == filter)
        {
            entry.qos = qos;
            return;
        }
        self.entries.push(SubscriptionEntry {
            token,
            filter: filter.to_string(),
            qos,
        });
    }

    /// Remove one subscription by exact filter.
    pub fn unsubscribe(&mut self, token: Token, filter: &str) {
        self.entries
            .retain(|e| !(e.token == token && e.filter == filter));
    }

    /// Remove every entry owned by a session. Must run before the session
    /// itself is destroyed.
    pub fn remove_session(&mut self, token: Token) {
        self.entries.retain(|e| e.token != token);
    }

    /// Collect `(token, granted QoS)` for every entry whose filter matches
    /// the topic. One pair per entry: overlapping filters yield duplicates.
    pub fn matching(&self, topic: &str) -> Vec<(Token, QoS)> {
        self.entries
            .iter()
            .filter(|e| topic::matches(topic, &e.filter))
            .map(|e| (e.token, e.qos))
            .collect()
    }

    /// True if any entry references the given session.
    pub fn has_session(&self, token: Token) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_wildcard_matching() {
        let mut index = SubscriptionIndex::new();
        index.subscribe(Token(2), "sensors/temp", QoS::AtMostOnce);
        index.subscribe(Token(3), "sensors/+", QoS::AtLeastOnce);
        index.subscribe(Token(4), "actuators/#", QoS::ExactlyOnce);

        let hits = index.matching("sensors/temp");
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&(Token(2), QoS::AtMostOnce)));
        assert!(hits.contains(&(Token(3), QoS::AtLeastOnce)));

        let hits = index.matching("actuators/light/1");
        assert_eq!(hits, vec![(Token(4), QoS::ExactlyOnce)]);

        assert!(index.matching("other").is_empty());
    }

    #[test]
    fn test_overlapping_filters_deliver_twice() {
        let mut index = SubscriptionIndex::new();
        index.subscribe(Token(2), "a/+", QoS::AtMostOnce);
        index.subscribe(Token(2), "a/#", QoS::AtMostOnce);

        // Same session, two matching entries: two deliveries
        assert_eq!(index.matching("a/b").len(), 2);
    }

    #[test]
    fn test_resubscribe_replaces_granted_qos() {
        let mut index = SubscriptionIndex::new();
        index.subscribe(Token(2), "a/b", QoS::AtMostOnce);
        index.subscribe(Token(2), "a/b", QoS::ExactlyOnce);

        assert_eq!(index.len(), 1);
        assert_eq!(index.matching("a/b"), vec![(Token(2), QoS::ExactlyOnce)]);
    }

    #[test]
    fn test_unsubscribe_is_exact() {
        let mut index = SubscriptionIndex::new();
        index.subscribe(Token(2), "a/+", QoS::AtMostOnce);
        index.subscribe(Token(2), "a/b", QoS::AtMostOnce);

        index.unsubscribe(Token(2), "a/+");
        assert_eq!(index.len(), 1);
        assert_eq!(index.matching("a/b"), vec![(Token(2), QoS::AtMostOnce)]);
    }

    #[test]
    fn test_remove_session_leaves_no_entries() {
        let mut index = SubscriptionIndex::new();
        index.subscribe(Token(2), "a/b", QoS::AtMostOnce);
        index.subscribe(Token(2), "c/#", QoS::AtLeastOnce);
        index.subscribe(Token(3), "a/b", QoS::AtMostOnce);

        index.remove_session(Token(2));
        assert!(!index.has_session(Token(2)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.matching("a/b"), vec![(Token(3), QoS::AtMostOnce)]);
    }
}
