//! Host query types shared by every platform sensor.
//!
//! A sensor only answers questions about the host at call time. It keeps no
//! state between calls and never decides what a failed query means for the
//! snapshot; that policy lives in the snapshot builder.

use thiserror::Error;

/// Opaque handle to the foreground window.
///
/// Win32 `HWND` values and X11 window ids both fit in 64 bits, so the handle
/// is stored as a plain integer and converted back by the sensor that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// The process that owns the foreground window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    /// Executable name, e.g. `notepad.exe` or `firefox`
    pub name: String,
    /// Operating system process id
    pub pid: u32,
}

/// Errors reported by a single host query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    /// No window currently has input focus.
    #[error("no foreground window")]
    NoForegroundWindow,

    /// The owning process exists by id but could not be opened.
    #[error("could not open process {pid}: {reason}")]
    ProcessLookup { pid: u32, reason: String },

    /// The host cannot report the last input time.
    #[error("last input time unavailable: {0}")]
    InputInfoUnavailable(String),

    /// Any other query failure (display connection lost, API error, ...).
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface over the host desktop session.
///
/// Implementations exist per target platform; tests use scripted fakes.
pub trait Sensor {
    /// Handle of the window currently receiving input.
    fn foreground_window(&self) -> Result<WindowHandle, SensorError>;

    /// Name and pid of the process owning `window`.
    ///
    /// Returns [`SensorError::ProcessLookup`] when the pid is known but the
    /// process cannot be opened (exited, access denied).
    fn foreground_process(&self, window: WindowHandle) -> Result<ProcessIdentity, SensorError>;

    /// Title of `window`. An untitled window yields `Ok(String::new())`.
    fn window_title(&self, window: WindowHandle) -> Result<String, SensorError>;

    /// Seconds since the last keyboard or mouse input.
    fn idle_seconds(&self) -> Result<u64, SensorError>;

    /// Whether `window` covers its whole monitor. False when undeterminable.
    fn is_fullscreen(&self, window: WindowHandle) -> bool;

    /// Executable path and command line of `pid`, see [`format_extra_info`].
    fn extra_info(&self, pid: u32) -> String;
}

/// Render process metadata as `exe=<path>;cmd=<command line>`.
///
/// Missing or blank parts are left out, so a process with neither yields an
/// empty string.
pub fn format_extra_info(exe: Option<&str>, cmdline: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(exe) = exe.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("exe={exe}"));
    }
    if let Some(cmd) = cmdline.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("cmd={cmd}"));
    }
    parts.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_info_both_fields() {
        let info = format_extra_info(
            Some(r"C:\Windows\notepad.exe"),
            Some(r"notepad.exe C:\notes.txt"),
        );
        assert_eq!(
            info,
            r"exe=C:\Windows\notepad.exe;cmd=notepad.exe C:\notes.txt"
        );
    }

    #[test]
    fn test_extra_info_omits_missing_fields() {
        assert_eq!(format_extra_info(Some("/usr/bin/vim"), None), "exe=/usr/bin/vim");
        assert_eq!(format_extra_info(None, Some("vim notes.md")), "cmd=vim notes.md");
        assert_eq!(format_extra_info(Some("  "), Some("")), "");
        assert_eq!(format_extra_info(None, None), "");
    }

    #[test]
    fn test_sensor_error_display() {
        let err = SensorError::ProcessLookup {
            pid: 42,
            reason: "access denied".to_string(),
        };
        assert_eq!(err.to_string(), "could not open process 42: access denied");
        assert_eq!(
            SensorError::NoForegroundWindow.to_string(),
            "no foreground window"
        );
    }
}
