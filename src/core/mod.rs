//! Core rate aggregation.
//!
//! This module contains:
//! - The producer-side accumulator
//! - The ring buffer of per-tick slots
//! - Rate math over the window
//! - The aggregator tying them together
//! - Timestamped activity: instant rates, clicks and the bucketed APM history

pub mod accumulator;
pub mod activity;
pub mod aggregator;
pub mod history;
pub mod rate;
pub mod recent;
pub mod ring;

// Re-export commonly used types
pub use accumulator::{Accumulator, Intake};
pub use activity::{ActivityMetrics, ActivitySnapshot};
pub use aggregator::{Aggregator, ConservationSnapshot, DEFAULT_WINDOW_SIZE};
pub use history::BucketHistory;
pub use rate::{CurrentData, Totals, WindowSummary, MILLIS_PER_MINUTE};
pub use recent::{instant_per_minute, ExpiringBuffer};
pub use ring::{RingBuffer, Slot};
