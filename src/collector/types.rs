//! Input event types delivered by the platform hook.
//!
//! Keyboard events carry the keycode and direction so held keys can be told apart from new
//! presses; pointer events carry the absolute cursor position so the aggregator can measure
//! travelled distance. Every event is timestamped by the hook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An absolute pointer position in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A key press or release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Platform virtual keycode
    pub keycode: u16,
    /// Character produced by the key, when the platform can resolve one
    pub key: Option<char>,
    /// Whether this is a key press (true) or release (false)
    pub is_key_down: bool,
}

impl KeyboardEvent {
    pub fn press(keycode: u16, key: Option<char>) -> Self {
        Self {
            timestamp: Utc::now(),
            keycode,
            key,
            is_key_down: true,
        }
    }

    pub fn release(keycode: u16) -> Self {
        Self {
            timestamp: Utc::now(),
            keycode,
            key: None,
            is_key_down: false,
        }
    }

    /// Same event, stamped at `timestamp`.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Pointer button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Any further button, by platform button number
    Other(u8),
}

impl MouseButton {
    /// Left and right presses count as clicks; every button press counts as an action.
    pub fn is_click(&self) -> bool {
        matches!(self, MouseButton::Left | MouseButton::Right)
    }
}

/// A pointer button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    pub button: MouseButton,
}

impl ClickEvent {
    pub fn new(button: MouseButton) -> Self {
        Self {
            timestamp: Utc::now(),
            button,
        }
    }

    /// Same event, stamped at `timestamp`.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A pointer move to an absolute position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Cursor position after the move
    pub position: Position,
}

impl PointerEvent {
    pub fn moved_to(x: f64, y: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            position: Position::new(x, y),
        }
    }
}

/// Unified event type for the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorEvent {
    Keyboard(KeyboardEvent),
    Pointer(PointerEvent),
    Click(ClickEvent),
}

impl SensorEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SensorEvent::Keyboard(e) => e.timestamp,
            SensorEvent::Pointer(e) => e.timestamp,
            SensorEvent::Click(e) => e.timestamp,
        }
    }
}
