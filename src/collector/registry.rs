//! Reference-counted ownership of the process-wide input hook.
//!
//! The platform hook is global: every aggregator in the process shares it. The registry
//! installs the hook on the first registration, removes it when the last registration is
//! released, and runs a dispatch thread that fans hook events out to listeners.

use crate::collector::hook::{CollectorConfig, CollectorError, PlatformHook};
use crate::collector::types::SensorEvent;
use crate::collector::Collector;
use crossbeam_channel::RecvTimeoutError;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the dispatch thread waits for an event before re-checking its stop flag.
const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Receives events from the dispatch thread.
pub trait InputListener: Send + Sync {
    fn on_event(&self, event: &SensorEvent);
}

type ListenerList = Arc<RwLock<Vec<(u64, Weak<dyn InputListener>)>>>;

struct Dispatcher {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct RegistryState {
    hook: Box<dyn PlatformHook>,
    active: usize,
    next_id: u64,
    dispatcher: Option<Dispatcher>,
}

/// Shared registration service for the platform input hook.
pub struct HookRegistry {
    state: Mutex<RegistryState>,
    listeners: ListenerList,
}

impl HookRegistry {
    /// Create a registry around the given hook. The hook is not started until the first
    /// registration.
    pub fn new(hook: Box<dyn PlatformHook>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RegistryState {
                hook,
                active: 0,
                next_id: 0,
                dispatcher: None,
            }),
            listeners: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Create a registry around this platform's native hook.
    pub fn platform(config: CollectorConfig) -> Arc<Self> {
        Self::new(Box::new(Collector::new(config)))
    }

    /// Register a listener, installing the hook if this is the first registration.
    pub fn register(
        self: &Arc<Self>,
        listener: Weak<dyn InputListener>,
    ) -> Result<HookHandle, CollectorError> {
        let mut state = self.state.lock();

        if state.active == 0 {
            state.hook.start()?;
            let receiver = state.hook.receiver();
            let running = Arc::new(AtomicBool::new(true));
            let handle = spawn_dispatcher(receiver, self.listeners.clone(), running.clone());
            state.dispatcher = Some(Dispatcher { running, handle });
            info!("input hook installed");
        }

        state.active += 1;
        let id = state.next_id;
        state.next_id += 1;
        self.listeners.write().push((id, listener));
        debug!(id, active = state.active, "listener registered");

        Ok(HookHandle {
            registry: self.clone(),
            id,
            released: AtomicBool::new(false),
        })
    }

    /// Number of registrations that have not been released.
    pub fn active_registrations(&self) -> usize {
        self.state.lock().active
    }

    /// Whether the underlying platform hook is installed.
    pub fn is_hook_running(&self) -> bool {
        self.state.lock().hook.is_running()
    }

    /// Deliver an event to every live listener.
    pub fn dispatch(&self, event: &SensorEvent) {
        dispatch_to(&self.listeners, event);
    }

    fn release(&self, id: u64) -> Result<(), CollectorError> {
        self.listeners.write().retain(|(entry, _)| *entry != id);

        let mut state = self.state.lock();
        if state.active == 0 {
            return Ok(());
        }
        state.active -= 1;
        debug!(id, active = state.active, "listener released");

        if state.active > 0 {
            return Ok(());
        }

        if let Some(dispatcher) = state.dispatcher.take() {
            dispatcher.running.store(false, Ordering::SeqCst);
            // The last listener can be dropped on the dispatch thread itself
            if dispatcher.handle.thread().id() != thread::current().id() {
                let _ = dispatcher.handle.join();
            }
        }

        let result = state.hook.stop();

        // Events captured before the stop must not reach the next set of listeners
        let stale = state.hook.receiver().try_iter().count();
        if stale > 0 {
            debug!(stale, "discarded undelivered events");
        }

        match &result {
            Ok(()) => info!("input hook removed"),
            Err(e) => warn!(error = %e, "input hook did not stop cleanly"),
        }
        result
    }
}

fn spawn_dispatcher(
    receiver: crossbeam_channel::Receiver<SensorEvent>,
    listeners: ListenerList,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            match receiver.recv_timeout(DISPATCH_POLL_INTERVAL) {
                Ok(event) => dispatch_to(&listeners, &event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("input hook channel disconnected");
                    break;
                }
            }
        }
    })
}

fn dispatch_to(listeners: &ListenerList, event: &SensorEvent) {
    // Upgrade under the lock, call outside it: a listener dropped here releases its
    // registration, which needs the write lock.
    let live: Vec<Arc<dyn InputListener>> = listeners
        .read()
        .iter()
        .filter_map(|(_, listener)| listener.upgrade())
        .collect();

    for listener in &live {
        listener.on_event(event);
    }
}

/// One registration with a [`HookRegistry`]. Released explicitly or on drop.
pub struct HookHandle {
    registry: Arc<HookRegistry>,
    id: u64,
    released: AtomicBool,
}

impl HookHandle {
    /// Release the registration. Only the first call has any effect.
    pub fn release(&self) -> Result<(), CollectorError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.registry.release(self.id)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "releasing input hook registration on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{KeyboardEvent, PointerEvent};
    use crossbeam_channel::{bounded, Receiver, Sender};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct HookCounters {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct FakeHook {
        counters: Arc<HookCounters>,
        running: bool,
        fail_start: bool,
        sender: Sender<SensorEvent>,
        receiver: Receiver<SensorEvent>,
    }

    impl FakeHook {
        fn new(counters: Arc<HookCounters>, fail_start: bool) -> Self {
            let (sender, receiver) = bounded(16);
            Self {
                counters,
                running: false,
                fail_start,
                sender,
                receiver,
            }
        }
    }

    impl PlatformHook for FakeHook {
        fn start(&mut self) -> Result<(), CollectorError> {
            if self.fail_start {
                return Err(CollectorError::PermissionDenied);
            }
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CollectorError> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            self.running = false;
            // Events the platform queued while the hook was being removed
            let _ = self
                .sender
                .try_send(SensorEvent::Pointer(PointerEvent::moved_to(9.0, 9.0)));
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn receiver(&self) -> Receiver<SensorEvent> {
            self.receiver.clone()
        }
    }

    #[derive(Default)]
    struct CountingListener {
        keys: AtomicUsize,
        moves: AtomicUsize,
    }

    impl InputListener for CountingListener {
        fn on_event(&self, event: &SensorEvent) {
            match event {
                SensorEvent::Keyboard(_) | SensorEvent::Click(_) => {
                    self.keys.fetch_add(1, Ordering::SeqCst)
                }
                SensorEvent::Pointer(_) => self.moves.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    fn weak(listener: &Arc<CountingListener>) -> Weak<dyn InputListener> {
        let listener: Arc<dyn InputListener> = listener.clone();
        Arc::downgrade(&listener)
    }

    #[test]
    fn test_hook_started_once_and_stopped_after_last_release() {
        let counters = Arc::new(HookCounters::default());
        let registry = HookRegistry::new(Box::new(FakeHook::new(counters.clone(), false)));
        let a = Arc::new(CountingListener::default());
        let b = Arc::new(CountingListener::default());

        let handle_a = registry.register(weak(&a)).unwrap();
        let handle_b = registry.register(weak(&b)).unwrap();
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_registrations(), 2);

        handle_a.release().unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
        assert!(registry.is_hook_running());

        handle_b.release().unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_registrations(), 0);
        assert!(!registry.is_hook_running());
    }

    #[test]
    fn test_double_release_does_not_underflow() {
        let counters = Arc::new(HookCounters::default());
        let registry = HookRegistry::new(Box::new(FakeHook::new(counters.clone(), false)));
        let a = Arc::new(CountingListener::default());
        let b = Arc::new(CountingListener::default());

        let handle_a = registry.register(weak(&a)).unwrap();
        let _handle_b = registry.register(weak(&b)).unwrap();

        handle_a.release().unwrap();
        handle_a.release().unwrap();
        assert!(handle_a.is_released());
        assert_eq!(registry.active_registrations(), 1);
        assert!(registry.is_hook_running());
    }

    #[test]
    fn test_start_failure_is_surfaced() {
        let counters = Arc::new(HookCounters::default());
        let registry = HookRegistry::new(Box::new(FakeHook::new(counters, true)));
        let a = Arc::new(CountingListener::default());

        let result = registry.register(weak(&a));
        assert_eq!(result.err(), Some(CollectorError::PermissionDenied));
        assert_eq!(registry.active_registrations(), 0);
    }

    #[test]
    fn test_dispatch_reaches_live_listeners_only() {
        let counters = Arc::new(HookCounters::default());
        let registry = HookRegistry::new(Box::new(FakeHook::new(counters, false)));
        let a = Arc::new(CountingListener::default());
        let b = Arc::new(CountingListener::default());

        let _handle_a = registry.register(weak(&a)).unwrap();
        let handle_b = registry.register(weak(&b)).unwrap();

        registry.dispatch(&SensorEvent::Keyboard(KeyboardEvent::press(0, None)));
        handle_b.release().unwrap();
        registry.dispatch(&SensorEvent::Pointer(PointerEvent::moved_to(1.0, 1.0)));

        assert_eq!(a.keys.load(Ordering::SeqCst), 1);
        assert_eq!(a.moves.load(Ordering::SeqCst), 1);
        assert_eq!(b.keys.load(Ordering::SeqCst), 1);
        assert_eq!(b.moves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_releases_registration() {
        let counters = Arc::new(HookCounters::default());
        let registry = HookRegistry::new(Box::new(FakeHook::new(counters.clone(), false)));
        let a = Arc::new(CountingListener::default());

        {
            let _handle = registry.register(weak(&a)).unwrap();
            assert_eq!(registry.active_registrations(), 1);
        }
        assert_eq!(registry.active_registrations(), 0);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_queued_before_stop_are_not_replayed() {
        let counters = Arc::new(HookCounters::default());
        let hook = FakeHook::new(counters, false);
        let receiver = hook.receiver.clone();
        let registry = HookRegistry::new(Box::new(hook));
        let a = Arc::new(CountingListener::default());

        let handle = registry.register(weak(&a)).unwrap();
        handle.release().unwrap();
        assert!(receiver.is_empty());

        let b = Arc::new(CountingListener::default());
        let _handle = registry.register(weak(&b)).unwrap();
        std::thread::sleep(DISPATCH_POLL_INTERVAL * 2);
        assert_eq!(b.moves.load(Ordering::SeqCst), 0);
    }
}
