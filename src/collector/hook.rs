//! The seam between the registry and a platform input hook.

use crate::collector::types::SensorEvent;
use crossbeam_channel::Receiver;

/// Capacity of the channel between the hook thread and the dispatch thread.
pub const EVENT_CHANNEL_CAPACITY: usize = 10_000;

/// Configuration for which event sources to capture.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_pointer: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_pointer: true,
        }
    }
}

/// A process-wide input hook.
///
/// Implementations push events into the channel returned by [`PlatformHook::receiver`]
/// from their own thread and must never block on a full channel.
pub trait PlatformHook: Send {
    /// Install the hook. Fails if the platform refuses (missing permission, etc).
    fn start(&mut self) -> Result<(), CollectorError>;

    /// Remove the hook and stop its thread.
    fn stop(&mut self) -> Result<(), CollectorError>;

    fn is_running(&self) -> bool;

    /// Receiving end of the hook's event channel.
    fn receiver(&self) -> Receiver<SensorEvent>;
}

/// Errors raised while installing or removing the input hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    AlreadyRunning,
    PermissionDenied,
    TapCreationFailed,
    RunLoopSourceFailed,
    HookStopFailed(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Input hook is already running"),
            CollectorError::PermissionDenied => {
                write!(f, "Input Monitoring permission not granted")
            }
            CollectorError::TapCreationFailed => write!(f, "Failed to create input event tap"),
            CollectorError::RunLoopSourceFailed => {
                write!(f, "Failed to create run loop source")
            }
            CollectorError::HookStopFailed(e) => write!(f, "Failed to stop input hook: {e}"),
        }
    }
}

impl std::error::Error for CollectorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert!(config.capture_keyboard);
        assert!(config.capture_pointer);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CollectorError::HookStopFailed("busy".into()).to_string(),
            "Failed to stop input hook: busy"
        );
        assert!(CollectorError::PermissionDenied
            .to_string()
            .contains("permission"));
    }
}
