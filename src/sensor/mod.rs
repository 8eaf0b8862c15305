//! Host sensors for the activity sampler.
//!
//! This module provides platform-specific implementations of the [`Sensor`]
//! capability: foreground window, owning process, title, input idle time and
//! fullscreen state.

pub mod types;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub mod noop;

// Re-export commonly used types
pub use types::{format_extra_info, ProcessIdentity, Sensor, SensorError, WindowHandle};

#[cfg(target_os = "windows")]
pub use windows::WindowsSensor;

/// Platform-agnostic sensor type alias
#[cfg(target_os = "windows")]
pub type HostSensor = WindowsSensor;

#[cfg(target_os = "linux")]
pub use linux::LinuxSensor;

/// Platform-agnostic sensor type alias
#[cfg(target_os = "linux")]
pub type HostSensor = LinuxSensor;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub use noop::NoopSensor;

/// Platform-agnostic sensor type alias
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub type HostSensor = NoopSensor;
