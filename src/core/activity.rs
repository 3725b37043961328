//! Timestamped activity: instant rates, click counts and the long-run APM history.
//!
//! Fed from hook events, which carry their own timestamps, rather than from the tick
//! loop. An action is a fresh key press or any pointer button press.

use crate::collector::types::MouseButton;
use crate::core::history::{BucketHistory, DEFAULT_BUCKET_MILLIS, DEFAULT_HISTORY_BUCKETS};
use crate::core::recent::{instant_per_minute, ExpiringBuffer};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Recent actions kept for the instant APM.
pub const RECENT_ACTIONS: usize = 32;
/// How long an action counts towards the instant APM.
pub const RECENT_ACTIONS_TTL_MILLIS: i64 = 1_000;
/// Recent clicks kept for the instant clicks per minute.
pub const RECENT_CLICKS: usize = 20;
/// How long a click counts towards the instant clicks per minute.
pub const RECENT_CLICKS_TTL_MILLIS: i64 = 3_000;

/// Point-in-time view of the timestamped metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    /// Actions per minute extrapolated from the spacing of the last second's actions
    pub instant_apm: u32,
    /// Clicks per minute extrapolated the same way over the last three seconds
    pub instant_clicks_per_minute: u32,
    pub total_clicks: u64,
    /// APM per history bucket, oldest first
    pub historical_apm: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct ActivityMetrics {
    recent_actions: ExpiringBuffer<DateTime<Utc>>,
    recent_clicks: ExpiringBuffer<DateTime<Utc>>,
    history: BucketHistory,
    last_action: Option<DateTime<Utc>>,
    total_clicks: u64,
}

impl ActivityMetrics {
    pub fn new(started: DateTime<Utc>) -> Self {
        Self {
            recent_actions: ExpiringBuffer::new(
                RECENT_ACTIONS,
                TimeDelta::milliseconds(RECENT_ACTIONS_TTL_MILLIS),
            ),
            recent_clicks: ExpiringBuffer::new(
                RECENT_CLICKS,
                TimeDelta::milliseconds(RECENT_CLICKS_TTL_MILLIS),
            ),
            history: BucketHistory::new(
                DEFAULT_HISTORY_BUCKETS,
                TimeDelta::milliseconds(DEFAULT_BUCKET_MILLIS),
                started,
            ),
            last_action: None,
            total_clicks: 0,
        }
    }

    pub fn record_action(&mut self, at: DateTime<Utc>) {
        self.recent_actions.push(at, at);
        if let Some(last) = self.last_action {
            self.history.record_gap(at, at - last);
        }
        self.last_action = Some(at);
    }

    /// Every button press is an action; left and right presses are also clicks.
    pub fn record_button(&mut self, button: MouseButton, at: DateTime<Utc>) {
        self.record_action(at);
        if button.is_click() {
            self.recent_clicks.push(at, at);
            self.total_clicks += 1;
        }
    }

    pub fn instant_apm(&mut self, now: DateTime<Utc>) -> u32 {
        instant_per_minute(self.recent_actions.live(now))
    }

    pub fn instant_clicks_per_minute(&mut self, now: DateTime<Utc>) -> u32 {
        instant_per_minute(self.recent_clicks.live(now))
    }

    pub fn total_clicks(&self) -> u64 {
        self.total_clicks
    }

    pub fn historical_apm(&mut self, now: DateTime<Utc>) -> Vec<u64> {
        self.history.per_minute(now)
    }

    pub fn snapshot(&mut self, now: DateTime<Utc>) -> ActivitySnapshot {
        ActivitySnapshot {
            instant_apm: self.instant_apm(now),
            instant_clicks_per_minute: self.instant_clicks_per_minute(now),
            total_clicks: self.total_clicks,
            historical_apm: self.historical_apm(now),
        }
    }
}
