//! Linux implementation of the host sensor for X11 sessions.
//!
//! Window queries go through EWMH properties on the root window, idle time
//! through the MIT-SCREEN-SAVER extension, and process metadata through
//! `/proc/<pid>`. Without an X server (Wayland-only or headless) every
//! window query reports [`SensorError::NoForegroundWindow`].

use crate::sensor::types::{format_extra_info, ProcessIdentity, Sensor, SensorError, WindowHandle};
use std::path::PathBuf;
use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::screensaver;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

/// Sensor backed by the X11 display named in `$DISPLAY`.
pub struct LinuxSensor {
    conn: Option<RustConnection>,
    root: Window,
    screen_width: u16,
    screen_height: u16,
    proc_root: PathBuf,
}

impl Default for LinuxSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxSensor {
    pub fn new() -> Self {
        let disconnected = Self {
            conn: None,
            root: 0,
            screen_width: 0,
            screen_height: 0,
            proc_root: PathBuf::from("/proc"),
        };

        match x11rb::connect(None) {
            Ok((conn, screen_num)) => {
                let Some(screen) = conn.setup().roots.get(screen_num) else {
                    warn!(screen_num, "X screen out of range, window sampling disabled");
                    return disconnected;
                };
                let (root, screen_width, screen_height) =
                    (screen.root, screen.width_in_pixels, screen.height_in_pixels);
                Self {
                    conn: Some(conn),
                    root,
                    screen_width,
                    screen_height,
                    ..disconnected
                }
            }
            Err(e) => {
                warn!(error = %e, "could not connect to X server, window sampling disabled");
                disconnected
            }
        }
    }

    fn conn(&self) -> Result<&RustConnection, SensorError> {
        self.conn.as_ref().ok_or(SensorError::NoForegroundWindow)
    }

    fn atom(&self, name: &str) -> Option<u32> {
        self.conn
            .as_ref()?
            .intern_atom(false, name.as_bytes())
            .ok()?
            .reply()
            .ok()
            .map(|r| r.atom)
    }

    fn property_u32s(&self, window: Window, property: u32, kind: AtomEnum) -> Option<Vec<u32>> {
        let reply = self
            .conn
            .as_ref()?
            .get_property(false, window, property, kind, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        let values: Vec<u32> = reply.value32()?.collect();
        Some(values)
    }

    fn property_string(&self, window: Window, property: u32) -> Option<String> {
        let reply = self
            .conn
            .as_ref()?
            .get_property(false, window, property, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        Some(decode_text_property(reply.type_, &reply.value))
    }

    fn window_pid(&self, window: Window) -> Option<u32> {
        let atom = self.atom("_NET_WM_PID")?;
        self.property_u32s(window, atom, AtomEnum::CARDINAL)?
            .first()
            .copied()
    }

    fn has_fullscreen_state(&self, window: Window) -> bool {
        let (Some(state), Some(fullscreen)) = (
            self.atom("_NET_WM_STATE"),
            self.atom("_NET_WM_STATE_FULLSCREEN"),
        ) else {
            return false;
        };
        self.property_u32s(window, state, AtomEnum::ATOM)
            .map(|atoms| atoms.contains(&fullscreen))
            .unwrap_or(false)
    }

    fn covers_screen(&self, window: Window) -> Option<bool> {
        let conn = self.conn.as_ref()?;
        let geometry = conn.get_geometry(window).ok()?.reply().ok()?;
        let origin = conn
            .translate_coordinates(window, self.root, 0, 0)
            .ok()?
            .reply()
            .ok()?;
        Some(
            origin.dst_x == 0
                && origin.dst_y == 0
                && geometry.width == self.screen_width
                && geometry.height == self.screen_height,
        )
    }

    fn read_proc(&self, pid: u32, entry: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.proc_root.join(pid.to_string()).join(entry))
    }
}

/// Decode a text property. ICCCM `STRING` is Latin-1; everything else
/// (`UTF8_STRING`, `COMPOUND_TEXT` in practice ASCII) is read as UTF-8.
fn decode_text_property(type_: u32, value: &[u8]) -> String {
    if type_ == u32::from(AtomEnum::STRING) {
        value.iter().map(|&b| char::from(b)).collect()
    } else {
        String::from_utf8_lossy(value).into_owned()
    }
}

impl Sensor for LinuxSensor {
    fn foreground_window(&self) -> Result<WindowHandle, SensorError> {
        self.conn()?;
        let atom = self
            .atom("_NET_ACTIVE_WINDOW")
            .ok_or(SensorError::NoForegroundWindow)?;
        match self
            .property_u32s(self.root, atom, AtomEnum::WINDOW)
            .and_then(|ids| ids.first().copied())
        {
            Some(id) if id != 0 => Ok(WindowHandle(u64::from(id))),
            _ => Err(SensorError::NoForegroundWindow),
        }
    }

    fn foreground_process(&self, window: WindowHandle) -> Result<ProcessIdentity, SensorError> {
        let pid = self
            .window_pid(window.0 as Window)
            .ok_or_else(|| SensorError::Unavailable("window has no _NET_WM_PID".to_string()))?;
        let name = self
            .read_proc(pid, "comm")
            .map_err(|e| SensorError::ProcessLookup {
                pid,
                reason: e.to_string(),
            })?;
        Ok(ProcessIdentity {
            name: name.trim_end().to_string(),
            pid,
        })
    }

    fn window_title(&self, window: WindowHandle) -> Result<String, SensorError> {
        self.conn()
            .map_err(|_| SensorError::Unavailable("no X connection".to_string()))?;
        let window = window.0 as Window;
        let title = self
            .atom("_NET_WM_NAME")
            .and_then(|atom| self.property_string(window, atom))
            .filter(|t| !t.is_empty())
            .or_else(|| self.property_string(window, AtomEnum::WM_NAME.into()))
            .unwrap_or_default();
        Ok(title)
    }

    fn idle_seconds(&self) -> Result<u64, SensorError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| SensorError::InputInfoUnavailable("no X connection".to_string()))?;
        let info = screensaver::query_info(conn, self.root)
            .map_err(|e| SensorError::InputInfoUnavailable(e.to_string()))?
            .reply()
            .map_err(|e| SensorError::InputInfoUnavailable(e.to_string()))?;
        Ok(u64::from(info.ms_since_user_input / 1000))
    }

    fn is_fullscreen(&self, window: WindowHandle) -> bool {
        let window = window.0 as Window;
        self.has_fullscreen_state(window) || self.covers_screen(window).unwrap_or(false)
    }

    fn extra_info(&self, pid: u32) -> String {
        let exe = std::fs::read_link(self.proc_root.join(pid.to_string()).join("exe"))
            .ok()
            .map(|p| p.to_string_lossy().into_owned());
        let cmdline = self.read_proc(pid, "cmdline").ok().map(|raw| {
            raw.split('\0')
                .filter(|arg| !arg.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });
        format_extra_info(exe.as_deref(), cmdline.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_info_for_own_process() {
        let sensor = LinuxSensor {
            conn: None,
            root: 0,
            screen_width: 0,
            screen_height: 0,
            proc_root: PathBuf::from("/proc"),
        };
        let info = sensor.extra_info(std::process::id());
        assert!(info.starts_with("exe="));
        assert!(info.contains(";cmd="));
    }

    #[test]
    fn test_disconnected_sensor_reports_no_window() {
        let sensor = LinuxSensor {
            conn: None,
            root: 0,
            screen_width: 0,
            screen_height: 0,
            proc_root: PathBuf::from("/proc"),
        };
        assert_eq!(
            sensor.foreground_window(),
            Err(SensorError::NoForegroundWindow)
        );
        assert!(matches!(
            sensor.idle_seconds(),
            Err(SensorError::InputInfoUnavailable(_))
        ));
        assert!(!sensor.is_fullscreen(WindowHandle(1)));
    }

    #[test]
    fn test_latin1_window_name_is_decoded() {
        // "Café - Résumé" as ISO-8859-1
        let raw = b"Caf\xe9 - R\xe9sum\xe9";
        assert_eq!(
            decode_text_property(AtomEnum::STRING.into(), raw),
            "Café - Résumé"
        );

        let utf8 = "Café - Résumé".as_bytes();
        assert_eq!(decode_text_property(42, utf8), "Café - Résumé");
    }

    #[test]
    #[ignore] // Requires X11 display
    fn test_live_foreground_window() {
        let sensor = LinuxSensor::new();
        if let Ok(window) = sensor.foreground_window() {
            println!("Active: {:?}", sensor.window_title(window));
        }
    }
}
