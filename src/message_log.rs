//! Bounded log of recently delivered messages for the status snapshot.

use std::collections::VecDeque;

/// One delivered message, as shown on the dashboard.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub topic: String,
    pub payload: String,
    pub timestamp_ms: u64,
}

/// Ring of the most recent records; the oldest is evicted at capacity.
pub struct MessageLog {
    records: VecDeque<LogRecord>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, topic: &str, payload: &[u8], timestamp_ms: u64) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(LogRecord {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            timestamp_ms,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
