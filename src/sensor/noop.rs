//! Fallback sensor for targets without a supported desktop backend.
//!
//! This exists so the crate (and binary) can compile on every target. The
//! driver sees no foreground window and skips every tick.

use crate::sensor::types::{ProcessIdentity, Sensor, SensorError, WindowHandle};

/// A sensor that never finds a foreground window.
#[derive(Debug, Default)]
pub struct NoopSensor;

impl NoopSensor {
    pub fn new() -> Self {
        Self
    }
}

impl Sensor for NoopSensor {
    fn foreground_window(&self) -> Result<WindowHandle, SensorError> {
        Err(SensorError::NoForegroundWindow)
    }

    fn foreground_process(&self, _window: WindowHandle) -> Result<ProcessIdentity, SensorError> {
        Err(SensorError::NoForegroundWindow)
    }

    fn window_title(&self, _window: WindowHandle) -> Result<String, SensorError> {
        Ok(String::new())
    }

    fn idle_seconds(&self) -> Result<u64, SensorError> {
        Err(SensorError::InputInfoUnavailable(
            "unsupported platform".to_string(),
        ))
    }

    fn is_fullscreen(&self, _window: WindowHandle) -> bool {
        false
    }

    fn extra_info(&self, _pid: u32) -> String {
        String::new()
    }
}
