//! macOS input hook using a CGEvent tap.
//!
//! Captures key presses and releases, pointer positions and button presses at the session
//! level. Requires Input
//! Monitoring permission; without it the tap cannot be created and [`PlatformHook::start`]
//! returns [`CollectorError::TapCreationFailed`].

use crate::collector::hook::{
    CollectorConfig, CollectorError, PlatformHook, EVENT_CHANNEL_CAPACITY,
};
use crate::collector::types::{
    ClickEvent, KeyboardEvent, MouseButton, PointerEvent, SensorEvent,
};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult, EventField,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// The macOS input hook.
pub struct MacOSCollector {
    config: CollectorConfig,
    sender: Sender<SensorEvent>,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MacOSCollector {
    pub fn new(config: CollectorConfig) -> Self {
        // Bounded so a stalled consumer cannot grow memory without limit
        let (sender, receiver) = bounded(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // The thread exits within one run loop interval once `running` is false
            let _ = handle.join();
        }
    }
}

impl PlatformHook for MacOSCollector {
    /// Start the tap on a background thread and wait until it is installed.
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let config = self.config.clone();
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::spawn(move || {
            if let Err(e) = run_event_loop(sender, running.clone(), config, ready_tx) {
                error!(error = %e, "event tap loop exited");
            }
            running.store(false, Ordering::SeqCst);
        });
        self.thread_handle = Some(handle);

        let outcome = ready_rx
            .recv()
            .unwrap_or(Err(CollectorError::TapCreationFailed));
        if outcome.is_err() {
            self.running.store(false, Ordering::SeqCst);
            self.join_thread();
        }
        outcome
    }

    fn stop(&mut self) -> Result<(), CollectorError> {
        self.running.store(false, Ordering::SeqCst);
        self.join_thread();

        // The channel outlives the tap; a restart must not replay these
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            debug!(dropped, "dropped events captured before stop");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> Receiver<SensorEvent> {
        self.receiver.clone()
    }
}

impl Drop for MacOSCollector {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Build a list of event types to capture based on configuration.
fn build_event_types(config: &CollectorConfig) -> Vec<CGEventType> {
    let mut types = Vec::new();

    if config.capture_keyboard {
        types.push(CGEventType::KeyDown);
        types.push(CGEventType::KeyUp);
    }

    if config.capture_pointer {
        types.push(CGEventType::MouseMoved);
        types.push(CGEventType::LeftMouseDragged);
        types.push(CGEventType::RightMouseDragged);
        types.push(CGEventType::LeftMouseDown);
        types.push(CGEventType::RightMouseDown);
        types.push(CGEventType::OtherMouseDown);
    }

    types
}

/// Run the Core Graphics event loop, reporting tap installation through `ready`.
fn run_event_loop(
    sender: Sender<SensorEvent>,
    running: Arc<AtomicBool>,
    config: CollectorConfig,
    ready: Sender<Result<(), CollectorError>>,
) -> Result<(), CollectorError> {
    let event_types = build_event_types(&config);

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        event_types,
        move |_proxy, event_type, event| {
            if let Some(sensor_event) = process_cg_event(event_type, event) {
                // Never block the tap; drop the event if the channel is full
                let _ = sender.try_send(sensor_event);
            }
            CallbackResult::Keep
        },
    ) {
        Ok(tap) => tap,
        Err(_) => {
            let _ = ready.send(Err(CollectorError::TapCreationFailed));
            return Err(CollectorError::TapCreationFailed);
        }
    };

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(source) => source,
        Err(_) => {
            let _ = ready.send(Err(CollectorError::RunLoopSourceFailed));
            return Err(CollectorError::RunLoopSourceFailed);
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }

    tap.enable();
    let _ = ready.send(Ok(()));
    debug!("event tap installed");

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            std::time::Duration::from_millis(100),
            false,
        );
    }

    // The tap is disabled when dropped
    debug!("event tap removed");
    Ok(())
}

/// Convert a CGEvent into a SensorEvent.
fn process_cg_event(event_type: CGEventType, event: &CGEvent) -> Option<SensorEvent> {
    use core_graphics::event::CGEventType::*;

    match event_type {
        KeyDown => {
            // Auto-repeat is a held key, not a new action
            if event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT) != 0 {
                return None;
            }
            let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
            Some(SensorEvent::Keyboard(KeyboardEvent::press(
                keycode as u16,
                keycode_to_char(keycode),
            )))
        }

        KeyUp => {
            let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
            Some(SensorEvent::Keyboard(KeyboardEvent::release(keycode as u16)))
        }

        LeftMouseDown => Some(SensorEvent::Click(ClickEvent::new(MouseButton::Left))),
        RightMouseDown => Some(SensorEvent::Click(ClickEvent::new(MouseButton::Right))),
        OtherMouseDown => {
            let number = event.get_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER);
            Some(SensorEvent::Click(ClickEvent::new(button_from_number(number))))
        }

        MouseMoved | LeftMouseDragged | RightMouseDragged => {
            let location = event.location();
            Some(SensorEvent::Pointer(PointerEvent::moved_to(
                location.x, location.y,
            )))
        }

        _ => None,
    }
}

/// CoreGraphics numbers the left, right and middle buttons 0, 1 and 2.
fn button_from_number(number: i64) -> MouseButton {
    match number {
        0 => MouseButton::Left,
        1 => MouseButton::Right,
        2 => MouseButton::Middle,
        n => MouseButton::Other(n.clamp(0, u8::MAX as i64) as u8),
    }
}

/// Map an ANSI virtual keycode to the character printed on the key.
fn keycode_to_char(keycode: i64) -> Option<char> {
    let c = match keycode {
        0 => 'a',
        1 => 's',
        2 => 'd',
        3 => 'f',
        4 => 'h',
        5 => 'g',
        6 => 'z',
        7 => 'x',
        8 => 'c',
        9 => 'v',
        11 => 'b',
        12 => 'q',
        13 => 'w',
        14 => 'e',
        15 => 'r',
        16 => 'y',
        17 => 't',
        18 => '1',
        19 => '2',
        20 => '3',
        21 => '4',
        22 => '6',
        23 => '5',
        25 => '9',
        26 => '7',
        28 => '8',
        29 => '0',
        31 => 'o',
        32 => 'u',
        34 => 'i',
        35 => 'p',
        37 => 'l',
        38 => 'j',
        40 => 'k',
        45 => 'n',
        46 => 'm',
        49 => ' ',
        _ => return None,
    };
    Some(c)
}

/// Check if the application has Input Monitoring permission.
///
/// macOS has no direct query; creating a passive tap fails without the permission.
pub fn check_permission() -> bool {
    let result = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    );

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation() {
        let collector = MacOSCollector::new(CollectorConfig::default());
        assert!(!collector.is_running());
    }

    #[test]
    fn test_event_types_follow_config() {
        let config = CollectorConfig {
            capture_keyboard: true,
            capture_pointer: false,
        };
        assert_eq!(build_event_types(&config).len(), 2);
    }

    #[test]
    fn test_button_numbers() {
        assert_eq!(button_from_number(0), MouseButton::Left);
        assert_eq!(button_from_number(2), MouseButton::Middle);
        assert_eq!(button_from_number(4), MouseButton::Other(4));
    }

    #[test]
    fn test_stop_discards_undelivered_events() {
        let mut collector = MacOSCollector::new(CollectorConfig::default());
        collector
            .sender
            .send(SensorEvent::Keyboard(KeyboardEvent::press(0, Some('a'))))
            .unwrap();

        collector.stop().unwrap();
        assert!(collector.receiver().is_empty());
    }

    #[test]
    fn test_keycode_mapping() {
        assert_eq!(keycode_to_char(13), Some('w'));
        assert_eq!(keycode_to_char(49), Some(' '));
        assert_eq!(keycode_to_char(53), None);
    }
}
