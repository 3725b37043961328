//! The sliding-window activity aggregator.
//!
//! Two locks:
//! - `intake` guards the accumulator, last pointer position and per-key totals. The hook
//!   dispatch thread only ever takes this one.
//! - `window` guards the ring, lifetime totals and last tick time. `tick`, `sample` and
//!   `set_window_size` all take it, so they are serialized against each other no matter
//!   which threads call them.
//!
//! When both are held, `window` is always taken first. A third lock, `activity`, guards
//! the timestamped metrics and is never held together with the other two.

use crate::collector::hook::CollectorError;
use crate::collector::registry::{HookHandle, HookRegistry, InputListener};
use crate::collector::types::{MouseButton, Position, SensorEvent};
use crate::core::accumulator::{Accumulator, Intake};
use crate::core::activity::{ActivityMetrics, ActivitySnapshot};
use crate::core::rate::{CurrentData, Totals, WindowSummary};
use crate::core::ring::{RingBuffer, Slot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Default window: five seconds of ticks at 60 Hz.
pub const DEFAULT_WINDOW_SIZE: usize = 60 * 5;

#[derive(Debug)]
struct Window {
    ring: RingBuffer,
    totals: Totals,
    last_tick_millis: i64,
}

/// Counts visible at one instant with both locks held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConservationSnapshot {
    /// Key actions in written slots
    pub windowed_key_actions: u64,
    /// Key actions not yet rotated into a slot
    pub pending_key_actions: u64,
    pub totals: Totals,
}

/// Converts raw input into APM / PPM over a window of recent ticks.
pub struct Aggregator {
    intake: Mutex<Intake>,
    window: Mutex<Window>,
    activity: Mutex<ActivityMetrics>,
    hook: Mutex<Option<HookHandle>>,
}

impl Aggregator {
    /// Create an aggregator that is not attached to any hook. Events can still be fed
    /// through the `record_*` methods.
    ///
    /// `window_size` below 1 falls back to [`DEFAULT_WINDOW_SIZE`].
    pub fn new(window_size: usize, now_millis: i64) -> Self {
        let capacity = if window_size < 1 {
            DEFAULT_WINDOW_SIZE
        } else {
            window_size
        };

        Self {
            intake: Mutex::new(Intake::default()),
            window: Mutex::new(Window {
                ring: RingBuffer::new(capacity),
                totals: Totals::default(),
                last_tick_millis: now_millis,
            }),
            activity: Mutex::new(ActivityMetrics::new(Utc::now())),
            hook: Mutex::new(None),
        }
    }

    /// Create an aggregator and register it with `registry`, installing the platform
    /// hook if no other aggregator has.
    pub fn attach(
        window_size: usize,
        now_millis: i64,
        registry: &Arc<HookRegistry>,
    ) -> Result<Arc<Self>, CollectorError> {
        let aggregator = Arc::new(Self::new(window_size, now_millis));
        let listener: Arc<dyn InputListener> = aggregator.clone();
        let weak: Weak<dyn InputListener> = Arc::downgrade(&listener);
        drop(listener);

        let handle = registry.register(weak)?;
        *aggregator.hook.lock() = Some(handle);
        Ok(aggregator)
    }

    pub fn record_key_action(&self) {
        self.intake.lock().record_key_action();
    }

    /// Record a key action and count it against `key`.
    pub fn record_key_press(&self, key: char) {
        self.intake.lock().record_key_press(key);
    }

    pub fn record_pointer_move(&self, position: Position) {
        self.intake.lock().record_pointer_move(position);
    }

    /// Record a key going down at `at`. A key that is already held is a repeat and is
    /// ignored until it is released.
    pub fn record_key_down(&self, keycode: u16, key: Option<char>, at: DateTime<Utc>) {
        {
            let mut intake = self.intake.lock();
            if !intake.press(keycode) {
                return;
            }
            match key {
                Some(key) => intake.record_key_press(key),
                None => intake.record_key_action(),
            }
        }
        self.activity.lock().record_action(at);
    }

    pub fn record_key_up(&self, keycode: u16) {
        self.intake.lock().release(keycode);
    }

    /// Record a pointer button press at `at`.
    pub fn record_click(&self, button: MouseButton, at: DateTime<Utc>) {
        self.activity.lock().record_button(button, at);
    }

    /// Instant rates, click totals and the APM history as of `now`.
    pub fn activity(&self, now: DateTime<Utc>) -> ActivitySnapshot {
        self.activity.lock().snapshot(now)
    }

    pub fn total_clicks(&self) -> u64 {
        self.activity.lock().total_clicks()
    }

    /// Rotate everything recorded since the previous tick into the next slot.
    pub fn tick(&self, now_millis: i64) {
        let mut window = self.window.lock();
        let snapshot: Accumulator = self.intake.lock().accumulator.take();

        // A clock that runs backwards yields a zero-length slot
        let elapsed_millis = now_millis.saturating_sub(window.last_tick_millis).max(0) as u64;
        window.last_tick_millis = now_millis;

        window.ring.push(Slot {
            elapsed_millis,
            key_actions: snapshot.key_actions,
            move_distance: snapshot.move_distance,
        });
        window.totals.total_actions += snapshot.key_actions;
        window.totals.total_distance += snapshot.move_distance;
    }

    /// Current rates over the window plus lifetime totals.
    pub fn sample(&self) -> CurrentData {
        let window = self.window.lock();
        CurrentData::new(&WindowSummary::of(&window.ring), &window.totals)
    }

    /// Raw sums over the current window.
    pub fn window_summary(&self) -> WindowSummary {
        WindowSummary::of(&self.window.lock().ring)
    }

    pub fn totals(&self) -> Totals {
        self.window.lock().totals
    }

    /// Replace the window with an empty one of `window_size` slots. Totals are kept.
    /// Sizes below 1 are ignored.
    pub fn set_window_size(&self, window_size: usize) {
        if window_size < 1 {
            debug!(window_size, "ignoring invalid window size");
            return;
        }
        let mut window = self.window.lock();
        window.ring = RingBuffer::new(window_size);
        debug!(window_size, "window resized");
    }

    pub fn window_size(&self) -> usize {
        self.window.lock().ring.capacity()
    }

    /// Lifetime presses of `key`, for keys the hook could resolve to a character.
    pub fn total_key_presses(&self, key: char) -> u64 {
        self.intake.lock().key_presses(key)
    }

    /// Whether this aggregator still holds a hook registration.
    pub fn is_attached(&self) -> bool {
        self.hook.lock().is_some()
    }

    /// Release the hook registration. Calls after the first are no-ops.
    pub fn shutdown(&self) -> Result<(), CollectorError> {
        let handle = self.hook.lock().take();
        match handle {
            Some(handle) => handle.release(),
            None => Ok(()),
        }
    }

    /// Windowed and pending key counts observed under both locks.
    pub fn conservation_snapshot(&self) -> ConservationSnapshot {
        let window = self.window.lock();
        let intake = self.intake.lock();
        ConservationSnapshot {
            windowed_key_actions: window.ring.written().map(|s| s.key_actions).sum(),
            pending_key_actions: intake.accumulator.key_actions,
            totals: window.totals,
        }
    }
}

impl InputListener for Aggregator {
    fn on_event(&self, event: &SensorEvent) {
        let at = event.timestamp();
        match event {
            SensorEvent::Keyboard(e) if e.is_key_down => {
                self.record_key_down(e.keycode, e.key, at)
            }
            SensorEvent::Keyboard(e) => self.record_key_up(e.keycode),
            SensorEvent::Pointer(e) => self.record_pointer_move(e.position),
            SensorEvent::Click(e) => self.record_click(e.button, at),
        }
    }
}
