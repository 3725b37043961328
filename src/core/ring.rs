//! Fixed-capacity ring of per-tick slots.

use serde::{Deserialize, Serialize};

/// Activity captured by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Milliseconds since the previous tick
    pub elapsed_millis: u64,
    pub key_actions: u64,
    pub move_distance: f64,
}

/// The sliding window. Holds the most recent `capacity` slots; slots that were never
/// written are `None` and take no part in aggregation.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Option<Slot>>,
    cursor: usize,
}

impl RingBuffer {
    /// Create an empty ring. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Write a slot at the cursor, overwriting the oldest entry once full.
    pub fn push(&mut self, slot: Slot) {
        self.slots[self.cursor] = Some(slot);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Written slots, in storage order.
    pub fn written(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().flatten()
    }

    pub fn written_count(&self) -> usize {
        self.written().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(keys: u64) -> Slot {
        Slot {
            elapsed_millis: 16,
            key_actions: keys,
            move_distance: 0.0,
        }
    }

    #[test]
    fn test_new_ring_is_unwritten() {
        let ring = RingBuffer::new(4);
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.written_count(), 0);
    }

    #[test]
    fn test_push_wraps_and_overwrites_oldest() {
        let mut ring = RingBuffer::new(3);
        for keys in 1..=4 {
            ring.push(slot(keys));
        }

        assert_eq!(ring.cursor(), 1);
        let keys: Vec<u64> = ring.written().map(|s| s.key_actions).collect();
        assert_eq!(keys, vec![4, 2, 3]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 1);
        ring.push(slot(3));
        assert_eq!(ring.written_count(), 1);
        assert_eq!(ring.cursor(), 0);
    }

    #[test]
    fn test_capacity_one() {
        let mut ring = RingBuffer::new(1);
        ring.push(slot(1));
        ring.push(slot(2));
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.written().map(|s| s.key_actions).sum::<u64>(), 2);
    }
}
