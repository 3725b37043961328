//! Rate computation over the written slots of a window.
//!
//! Rates are `count * 60000 / elapsed_ms`. An empty or zero-duration window reports
//! zero instead of dividing.

use crate::core::ring::RingBuffer;
use serde::{Deserialize, Serialize};

/// Milliseconds in one minute.
pub const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Lifetime counters. Never decrease and survive resizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_actions: u64,
    pub total_distance: f64,
}

/// Sums over the written slots of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Number of slots that contributed
    pub written_slots: usize,
    /// Sum of slot durations
    pub elapsed_millis: u64,
    /// Sum of key actions
    pub key_actions: u64,
    /// Sum of pointer distance
    pub move_distance: f64,
}

impl WindowSummary {
    /// Summarize every written slot of `ring`.
    pub fn of(ring: &RingBuffer) -> Self {
        ring.written().fold(Self::default(), |mut acc, slot| {
            acc.written_slots += 1;
            acc.elapsed_millis += slot.elapsed_millis;
            acc.key_actions += slot.key_actions;
            acc.move_distance += slot.move_distance;
            acc
        })
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_millis as f64 / MILLIS_PER_MINUTE
    }

    /// Key actions per minute (APM).
    pub fn key_rate_per_minute(&self) -> f64 {
        per_minute(self.key_actions as f64, self.elapsed_millis)
    }

    /// Pointer distance per minute (PPM).
    pub fn move_rate_per_minute(&self) -> f64 {
        per_minute(self.move_distance, self.elapsed_millis)
    }
}

fn per_minute(count: f64, elapsed_millis: u64) -> f64 {
    if elapsed_millis == 0 {
        return 0.0;
    }
    count * MILLIS_PER_MINUTE / elapsed_millis as f64
}

/// Windowed rates together with lifetime totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentData {
    pub key_rate_per_minute: u32,
    pub move_rate_per_minute: u64,
    pub total_actions: u64,
    pub total_distance: u64,
}

impl CurrentData {
    /// Build the report. Fractions are truncated here and nowhere earlier.
    pub fn new(summary: &WindowSummary, totals: &Totals) -> Self {
        Self {
            key_rate_per_minute: summary.key_rate_per_minute() as u32,
            move_rate_per_minute: summary.move_rate_per_minute() as u64,
            total_actions: totals.total_actions,
            total_distance: totals.total_distance as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ring::Slot;

    fn ring_with(slots: &[(u64, u64, f64)], capacity: usize) -> RingBuffer {
        let mut ring = RingBuffer::new(capacity);
        for &(elapsed_millis, key_actions, move_distance) in slots {
            ring.push(Slot {
                elapsed_millis,
                key_actions,
                move_distance,
            });
        }
        ring
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let summary = WindowSummary::of(&RingBuffer::new(5));
        assert_eq!(summary.written_slots, 0);
        assert_eq!(summary.key_rate_per_minute(), 0.0);
        assert_eq!(summary.move_rate_per_minute(), 0.0);
    }

    #[test]
    fn test_zero_duration_slots_report_zero() {
        let summary = WindowSummary::of(&ring_with(&[(0, 7, 3.0), (0, 2, 1.0)], 4));
        assert_eq!(summary.written_slots, 2);
        assert_eq!(summary.key_rate_per_minute(), 0.0);
        assert!(summary.move_rate_per_minute().is_finite());
    }

    #[test]
    fn test_unwritten_slots_do_not_dilute_rate() {
        let summary = WindowSummary::of(&ring_with(
            &[(1000, 10, 0.0), (1000, 20, 0.0), (1000, 30, 0.0)],
            5,
        ));
        assert_eq!(summary.written_slots, 3);
        assert!((summary.elapsed_minutes() - 0.05).abs() < 1e-12);
        assert_eq!(summary.key_rate_per_minute(), 1200.0);
    }

    #[test]
    fn test_current_data_truncates_at_report_time() {
        let summary = WindowSummary::of(&ring_with(&[(60_000, 1, 10.9)], 2));
        let totals = Totals {
            total_actions: 4,
            total_distance: 99.99,
        };
        let data = CurrentData::new(&summary, &totals);
        assert_eq!(data.key_rate_per_minute, 1);
        assert_eq!(data.move_rate_per_minute, 10);
        assert_eq!(data.total_actions, 4);
        assert_eq!(data.total_distance, 99);
    }
}
