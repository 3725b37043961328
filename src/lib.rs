//! Input Rate Agent - sliding-window keyboard and pointer activity rates.
//!
//! Turns a global input hook's stream of key presses and pointer positions into
//! actions-per-minute (APM) and pointer-distance-per-minute (PPM), smoothed over a
//! window of recent ticks, plus lifetime totals. Hook events also feed timestamped
//! metrics: an instant APM from the spacing of the last second's actions, clicks per
//! minute, and a 15 minute APM history in five second buckets.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Input Rate Agent                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Platform   │──▶│    Hook     │──▶│ Aggregator  │       │
//! │  │    Hook     │   │  Registry   │   │ (intake)    │       │
//! │  └─────────────┘   └─────────────┘   └──────┬──────┘       │
//! │                                       tick() │ sample()     │
//! │                                      ┌──────▼──────┐       │
//! │                                      │ Ring window │       │
//! │                                      │  + totals   │       │
//! │                                      └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use input_rate_agent::{Aggregator, CollectorConfig, HookRegistry};
//!
//! let registry = HookRegistry::platform(CollectorConfig::default());
//! let aggregator = Aggregator::attach(300, 0, &registry).expect("input hook unavailable");
//!
//! // Once per frame:
//! aggregator.tick(16);
//! let data = aggregator.sample();
//! println!("{} APM", data.key_rate_per_minute);
//!
//! aggregator.shutdown().expect("failed to release input hook");
//! ```

pub mod collector;
pub mod config;
pub mod core;

// Re-export key types at crate root for convenience
pub use collector::{
    CollectorConfig, CollectorError, HookHandle, HookRegistry, InputListener, PlatformHook,
    Position, SensorEvent,
};
pub use config::{Config, ConfigError, ConfigOverrides, SourceConfig};
pub use core::{
    ActivitySnapshot, Aggregator, CurrentData, Totals, WindowSummary, DEFAULT_WINDOW_SIZE,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
