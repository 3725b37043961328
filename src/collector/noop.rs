//! Non-macOS (noop) input hook.
//!
//! This exists so the crate (and binary) can compile on non-Apple targets
//! without pulling in CoreGraphics/CoreFoundation dependencies.

use crate::collector::hook::{
    CollectorConfig, CollectorError, PlatformHook, EVENT_CHANNEL_CAPACITY,
};
use crate::collector::types::SensorEvent;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A noop hook that never emits events.
pub struct NoopCollector {
    _config: CollectorConfig,
    _sender: Sender<SensorEvent>,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
}

impl NoopCollector {
    /// Create a new noop collector.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            _config: config,
            _sender: sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl PlatformHook for NoopCollector {
    /// On non-macOS platforms, this simply marks the collector as running.
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollectorError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> Receiver<SensorEvent> {
        self.receiver.clone()
    }
}

/// On non-macOS platforms there is no Input Monitoring permission gate.
pub fn check_permission() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_start_stop() {
        let mut collector = NoopCollector::new(CollectorConfig::default());
        assert!(!collector.is_running());
        collector.start().unwrap();
        assert_eq!(collector.start(), Err(CollectorError::AlreadyRunning));
        collector.stop().unwrap();
        assert!(!collector.is_running());
        assert!(collector.receiver().try_recv().is_err());
    }
}
