use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::shared::models::{CanonicalReading, Channel};

pub const DEFAULT_CAPACITY: usize = 100;

/// When and where the most recent reading was accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub at: DateTime<Utc>,
    pub channel: Channel,
}

/// Bounded, insertion-ordered reading history. The oldest entry is evicted
/// once `capacity` is exceeded; the tail is always the latest reading.
#[derive(Debug)]
pub struct ReadingStore {
    readings: VecDeque<CanonicalReading>,
    capacity: usize,
    last_id: i64,
    last_accepted: Option<Accepted>,
}

impl Default for ReadingStore {
    fn default() -> Self {
        ReadingStore::new(DEFAULT_CAPACITY)
    }
}

impl ReadingStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ReadingStore {
            readings: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_id: 0,
            last_accepted: None,
        }
    }

    /// Ingestion-order id: epoch millis, bumped past the previous id when
    /// the clock has not advanced.
    pub fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    pub fn append(&mut self, reading: CanonicalReading, channel: Channel) {
        self.last_accepted = Some(Accepted {
            at: reading.timestamp,
            channel,
        });
        self.last_id = self.last_id.max(reading.id);
        self.readings.push_back(reading);

        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&CanonicalReading> {
        self.readings.back()
    }

    /// Last `min(n, len)` readings, oldest first.
    pub fn history(&self, n: usize) -> Vec<CanonicalReading> {
        self.tail(n)
    }

    /// Same window as [`history`](Self::history), kept separate for debug inspection.
    pub fn recent(&self, n: usize) -> Vec<CanonicalReading> {
        self.tail(n)
    }

    fn tail(&self, n: usize) -> Vec<CanonicalReading> {
        let skip = self.readings.len().saturating_sub(n);
        self.readings.iter().skip(skip).cloned().collect()
    }

    pub fn last_accepted(&self) -> Option<Accepted> {
        self.last_accepted
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
