//! Long-run action rate grouped into fixed time buckets.
//!
//! Each bucket collects the gaps between consecutive actions that fell inside its time
//! span. A bucket's rate is `60000 / mean gap`. The head bucket closes once its span has
//! passed; buckets skipped over while idle are reset to empty.

use chrono::{DateTime, TimeDelta, Utc};

/// Number of buckets kept by default.
pub const DEFAULT_HISTORY_BUCKETS: usize = 180;

/// Span of one bucket by default.
pub const DEFAULT_BUCKET_MILLIS: i64 = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    gap_millis: i64,
    gaps: u64,
}

impl Bucket {
    fn per_minute(&self) -> u64 {
        if self.gaps == 0 || self.gap_millis <= 0 {
            return 0;
        }
        (60_000.0 * self.gaps as f64 / self.gap_millis as f64) as u64
    }
}

/// Ring of time buckets covering the last `buckets * bucket_span`.
#[derive(Debug, Clone)]
pub struct BucketHistory {
    buckets: Vec<Bucket>,
    head: usize,
    bucket_span: TimeDelta,
    head_closes_at: DateTime<Utc>,
}

impl BucketHistory {
    /// Start an empty history whose first bucket opens at `started`. A bucket count of 0
    /// is raised to 1, a non-positive span to one millisecond.
    pub fn new(buckets: usize, bucket_span: TimeDelta, started: DateTime<Utc>) -> Self {
        let bucket_span = bucket_span.max(TimeDelta::milliseconds(1));
        Self {
            buckets: vec![Bucket::default(); buckets.max(1)],
            head: 0,
            bucket_span,
            head_closes_at: started + bucket_span,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.gaps == 0)
    }

    /// Record the gap between two consecutive actions, the second of which happened at
    /// `now`. Negative gaps count as zero.
    pub fn record_gap(&mut self, now: DateTime<Utc>, gap: TimeDelta) {
        self.advance(now);
        let bucket = &mut self.buckets[self.head];
        bucket.gap_millis += gap.num_milliseconds().max(0);
        bucket.gaps += 1;
    }

    /// Per-minute rate of every bucket at `now`, oldest first. Empty buckets report 0.
    pub fn per_minute(&mut self, now: DateTime<Utc>) -> Vec<u64> {
        self.advance(now);
        let len = self.buckets.len();
        (1..=len)
            .map(|offset| self.buckets[(self.head + offset) % len].per_minute())
            .collect()
    }

    /// Close every bucket whose span ended before `now`.
    fn advance(&mut self, now: DateTime<Utc>) {
        if now <= self.head_closes_at {
            return;
        }

        let span = self.bucket_span.num_milliseconds();
        let overdue = (now - self.head_closes_at).num_milliseconds();
        let steps = (overdue + span - 1) / span;

        let len = self.buckets.len();
        for _ in 0..(steps as usize).min(len) {
            self.head = (self.head + 1) % len;
            self.buckets[self.head] = Bucket::default();
        }
        self.head_closes_at += TimeDelta::milliseconds(span * steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAN: i64 = 50;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn history() -> BucketHistory {
        BucketHistory::new(5, TimeDelta::milliseconds(SPAN), at(100))
    }

    #[test]
    fn test_gaps_accumulate_in_head_bucket() {
        let mut history = history();
        history.record_gap(at(100), TimeDelta::milliseconds(400));
        history.record_gap(at(100), TimeDelta::milliseconds(600));

        // Mean gap 500 ms
        assert_eq!(history.per_minute(at(100)), vec![0, 0, 0, 0, 120]);
    }

    #[test]
    fn test_buckets_rotate_with_time() {
        let mut history = history();
        for i in 0..=5 {
            let now = at(100 + SPAN * i);
            history.record_gap(now, TimeDelta::milliseconds(1_000 * (i + 1)));
        }

        // The head is still open at its exact closing instant, so the first two gaps
        // share a bucket
        assert_eq!(
            history.per_minute(at(100 + SPAN * 5)),
            vec![40, 20, 15, 12, 10]
        );
    }

    #[test]
    fn test_idle_buckets_are_skipped() {
        let mut history = history();
        history.record_gap(at(100), TimeDelta::milliseconds(1_000));
        let later = at(100 + SPAN * 2 + 1);
        history.record_gap(later, TimeDelta::milliseconds(2_000));

        assert_eq!(history.per_minute(later), vec![0, 0, 60, 0, 30]);
    }

    #[test]
    fn test_whole_history_expires() {
        let mut history = history();
        history.record_gap(at(100), TimeDelta::milliseconds(1_000));

        let later = at(100 + SPAN * 5 + 1);
        assert_eq!(history.per_minute(later), vec![0; 5]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_long_idle_keeps_bucket_alignment() {
        let mut history = history();
        // Far past the whole history; the head must still close on a span boundary
        history.record_gap(at(100 + SPAN * 1_000 + 10), TimeDelta::milliseconds(1_000));
        history.record_gap(at(100 + SPAN * 1_001 - 1), TimeDelta::milliseconds(1_000));
        assert_eq!(history.per_minute(at(100 + SPAN * 1_001)), vec![0, 0, 0, 0, 60]);
    }

    #[test]
    fn test_zero_gap_reports_zero() {
        let mut history = history();
        history.record_gap(at(100), TimeDelta::zero());
        history.record_gap(at(100), TimeDelta::milliseconds(-5));
        assert_eq!(history.per_minute(at(100)), vec![0; 5]);
        assert!(!history.is_empty());
    }
}
