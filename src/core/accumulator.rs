//! Producer-side scratch counters.
//!
//! Everything here is written by the hook dispatch thread between ticks and drained by
//! the tick loop. Pointer distance stays `f64` so sub-pixel moves are not lost to
//! per-event rounding.

use crate::collector::types::Position;
use std::collections::{HashMap, HashSet};

/// Activity recorded since the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub key_actions: u64,
    pub move_distance: f64,
}

impl Accumulator {
    /// Take the current counts and leave zeros behind.
    pub fn take(&mut self) -> Accumulator {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.key_actions == 0 && self.move_distance == 0.0
    }
}

/// State shared by the producer path, guarded as one unit by the aggregator's intake lock.
#[derive(Debug, Default)]
pub struct Intake {
    pub accumulator: Accumulator,
    /// Starts at the origin, so the first move is measured from (0, 0).
    pub last_position: Position,
    /// Lifetime presses per character.
    pub key_presses: HashMap<char, u64>,
    /// Keycodes currently held down.
    pub held_keys: HashSet<u16>,
}

impl Intake {
    pub fn record_key_action(&mut self) {
        self.accumulator.key_actions += 1;
    }

    pub fn record_key_press(&mut self, key: char) {
        self.record_key_action();
        *self.key_presses.entry(key).or_insert(0) += 1;
    }

    /// Add the distance from the last known position and remember the new one.
    pub fn record_pointer_move(&mut self, position: Position) {
        self.accumulator.move_distance += self.last_position.distance_to(position);
        self.last_position = position;
    }

    /// Mark `keycode` as down. Returns false if it was already held, in which case the
    /// press is a repeat and must not be counted.
    pub fn press(&mut self, keycode: u16) -> bool {
        self.held_keys.insert(keycode)
    }

    pub fn release(&mut self, keycode: u16) {
        self.held_keys.remove(&keycode);
    }

    pub fn key_presses(&self, key: char) -> u64 {
        self.key_presses.get(&key).copied().unwrap_or(0)
    }
}
