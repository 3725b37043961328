//! Short-lived history of recent events and the instant rate computed from it.
//!
//! Entries expire a fixed time after they were pushed and the buffer keeps at most
//! `capacity` of them, overwriting the oldest. Expired entries are evicted lazily on read.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;

/// Bounded buffer whose entries expire `ttl` after insertion.
#[derive(Debug, Clone)]
pub struct ExpiringBuffer<T> {
    entries: VecDeque<(DateTime<Utc>, T)>,
    capacity: usize,
    ttl: TimeDelta,
}

impl<T> ExpiringBuffer<T> {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize, ttl: TimeDelta) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `value` at `now`, dropping the oldest entry when full.
    pub fn push(&mut self, now: DateTime<Utc>, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((now + self.ttl, value));
    }

    /// Entries still alive at `now`, oldest first.
    pub fn live(&mut self, now: DateTime<Utc>) -> impl Iterator<Item = &T> {
        // Every entry shares the same ttl, so expiry follows insertion order
        while matches!(self.entries.front(), Some((expires_at, _)) if *expires_at < now) {
            self.entries.pop_front();
        }
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Extrapolate events per minute from the average spacing of `timestamps`.
///
/// Needs at least two timestamps spanning a positive interval; anything less is 0.
pub fn instant_per_minute<'a>(
    timestamps: impl IntoIterator<Item = &'a DateTime<Utc>>,
) -> u32 {
    let mut timestamps = timestamps.into_iter();
    let Some(first) = timestamps.next() else {
        return 0;
    };

    let mut intervals = 0u64;
    let mut last = first;
    for stamp in timestamps {
        intervals += 1;
        last = stamp;
    }

    let span_millis = (*last - *first).num_milliseconds();
    if intervals == 0 || span_millis <= 0 {
        return 0;
    }

    (60_000.0 * intervals as f64 / span_millis as f64) as u32
}
