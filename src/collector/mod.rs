//! Event collection module.
//!
//! Platform-specific input hooks plus the shared registry that owns them.

pub mod hook;
pub mod registry;
pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod noop;

// Re-export commonly used types
pub use hook::{CollectorConfig, CollectorError, PlatformHook};
pub use registry::{HookHandle, HookRegistry, InputListener};
pub use types::{ClickEvent, KeyboardEvent, MouseButton, PointerEvent, Position, SensorEvent};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "macos")]
pub type Collector = MacOSCollector;

#[cfg(not(target_os = "macos"))]
pub use noop::{check_permission, NoopCollector};

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "macos"))]
pub type Collector = NoopCollector;
