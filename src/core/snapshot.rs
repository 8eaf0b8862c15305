//! Activity snapshots and the builder that samples them from a sensor.
//!
//! One snapshot is built per driver tick. Individual sensor failures only
//! blank the affected field; the tick is abandoned only when there is no
//! foreground window at all.

use crate::sensor::Sensor;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// One point-in-time capture of the host's desktop activity.
///
/// Serializes to the collector wire format. `idle_seconds` travels as
/// `mouse_idle_seconds` and an empty `extra_info` is left out entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    /// Session user the sampler runs for
    pub user_id: String,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Executable name of the foreground process, empty if unresolvable
    pub process_name: String,
    /// Foreground window title, empty for untitled windows
    pub window_title: String,
    /// Seconds since the last keyboard or mouse input
    #[serde(rename = "mouse_idle_seconds")]
    pub idle_seconds: u64,
    /// Whether the foreground window covers its monitor
    pub is_fullscreen: bool,
    /// Executable path and command line of the foreground process
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_info: String,
}

impl ActivitySnapshot {
    /// Whether both snapshots describe the same activity.
    ///
    /// `user_id` and `timestamp` are deliberately not compared: a sample
    /// taken a minute later of the same window is not new activity.
    pub fn same_activity(&self, other: &ActivitySnapshot) -> bool {
        self.process_name == other.process_name
            && self.window_title == other.window_title
            && self.idle_seconds == other.idle_seconds
            && self.is_fullscreen == other.is_fullscreen
            && self.extra_info == other.extra_info
    }
}

/// Reasons a tick produces no snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Nothing has input focus; the tick is skipped.
    #[error("no active window to sample")]
    NoActiveWindow,
}

/// Builds snapshots for a fixed session user.
#[derive(Debug)]
pub struct SnapshotBuilder {
    user_id: String,
    last_timestamp: i64,
}

impl SnapshotBuilder {
    /// Create a builder for `user_id`, resolved once at startup.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            last_timestamp: i64::MIN,
        }
    }

    /// Get the session user id stamped on every snapshot.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Sample the sensor now.
    pub fn build(&mut self, sensor: &dyn Sensor) -> Result<ActivitySnapshot, BuildError> {
        self.build_at(sensor, Utc::now().timestamp_millis())
    }

    /// Sample the sensor, stamping the snapshot with `now_ms`.
    ///
    /// Timestamps never go backwards within one builder, even if the wall
    /// clock does.
    pub fn build_at(
        &mut self,
        sensor: &dyn Sensor,
        now_ms: i64,
    ) -> Result<ActivitySnapshot, BuildError> {
        let window = sensor
            .foreground_window()
            .map_err(|_| BuildError::NoActiveWindow)?;

        let (process_name, extra_info) = match sensor.foreground_process(window) {
            Ok(process) => {
                let extra = sensor.extra_info(process.pid);
                (process.name, extra)
            }
            Err(e) => {
                debug!(error = %e, "foreground process unknown");
                (String::new(), String::new())
            }
        };

        let window_title = sensor.window_title(window).unwrap_or_else(|e| {
            debug!(error = %e, "window title unavailable");
            String::new()
        });

        let idle_seconds = sensor.idle_seconds().unwrap_or_else(|e| {
            debug!(error = %e, "idle time unavailable");
            0
        });

        let is_fullscreen = sensor.is_fullscreen(window);

        self.last_timestamp = self.last_timestamp.max(now_ms);

        Ok(ActivitySnapshot {
            user_id: self.user_id.clone(),
            timestamp: self.last_timestamp,
            process_name,
            window_title,
            idle_seconds,
            is_fullscreen,
            extra_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{ProcessIdentity, SensorError, WindowHandle};

    struct FixedSensor {
        window: Result<WindowHandle, SensorError>,
        process: Result<ProcessIdentity, SensorError>,
        title: Result<String, SensorError>,
        idle: Result<u64, SensorError>,
        fullscreen: bool,
    }

    impl Default for FixedSensor {
        fn default() -> Self {
            Self {
                window: Ok(WindowHandle(7)),
                process: Ok(ProcessIdentity {
                    name: "notepad.exe".to_string(),
                    pid: 4242,
                }),
                title: Ok("notes.txt - Notepad".to_string()),
                idle: Ok(5),
                fullscreen: false,
            }
        }
    }

    impl Sensor for FixedSensor {
        fn foreground_window(&self) -> Result<WindowHandle, SensorError> {
            self.window.clone()
        }
        fn foreground_process(&self, _: WindowHandle) -> Result<ProcessIdentity, SensorError> {
            self.process.clone()
        }
        fn window_title(&self, _: WindowHandle) -> Result<String, SensorError> {
            self.title.clone()
        }
        fn idle_seconds(&self) -> Result<u64, SensorError> {
            self.idle.clone()
        }
        fn is_fullscreen(&self, _: WindowHandle) -> bool {
            self.fullscreen
        }
        fn extra_info(&self, pid: u32) -> String {
            format!("exe=C:\\app-{pid}.exe")
        }
    }

    #[test]
    fn test_build_full_snapshot() {
        let mut builder = SnapshotBuilder::new("alice");
        let snapshot = builder
            .build_at(&FixedSensor::default(), 1_700_000_000_000)
            .unwrap();

        assert_eq!(snapshot.user_id, "alice");
        assert_eq!(snapshot.timestamp, 1_700_000_000_000);
        assert_eq!(snapshot.process_name, "notepad.exe");
        assert_eq!(snapshot.window_title, "notes.txt - Notepad");
        assert_eq!(snapshot.idle_seconds, 5);
        assert!(!snapshot.is_fullscreen);
        assert_eq!(snapshot.extra_info, "exe=C:\\app-4242.exe");
    }

    #[test]
    fn test_no_window_skips_tick() {
        let sensor = FixedSensor {
            window: Err(SensorError::NoForegroundWindow),
            ..Default::default()
        };
        let mut builder = SnapshotBuilder::new("alice");
        assert_eq!(
            builder.build_at(&sensor, 1).unwrap_err(),
            BuildError::NoActiveWindow
        );
    }

    #[test]
    fn test_sensor_failures_degrade_fields() {
        let sensor = FixedSensor {
            process: Err(SensorError::ProcessLookup {
                pid: 4242,
                reason: "access denied".to_string(),
            }),
            title: Err(SensorError::Unavailable("gone".to_string())),
            idle: Err(SensorError::InputInfoUnavailable("no input info".to_string())),
            fullscreen: true,
            ..Default::default()
        };
        let mut builder = SnapshotBuilder::new("alice");
        let snapshot = builder.build_at(&sensor, 10).unwrap();

        assert_eq!(snapshot.process_name, "");
        assert_eq!(snapshot.extra_info, "");
        assert_eq!(snapshot.window_title, "");
        assert_eq!(snapshot.idle_seconds, 0);
        assert!(snapshot.is_fullscreen);
    }

    #[test]
    fn test_process_lost_after_window_found_still_samples() {
        let sensor = FixedSensor {
            window: Ok(WindowHandle(9)),
            process: Err(SensorError::NoForegroundWindow),
            ..Default::default()
        };
        let mut builder = SnapshotBuilder::new("alice");
        let snapshot = builder.build_at(&sensor, 10).unwrap();

        assert_eq!(snapshot.process_name, "");
        assert_eq!(snapshot.extra_info, "");
        assert_eq!(snapshot.window_title, "notes.txt - Notepad");
        assert_eq!(snapshot.idle_seconds, 5);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let sensor = FixedSensor::default();
        let mut builder = SnapshotBuilder::new("alice");

        let first = builder.build_at(&sensor, 2_000).unwrap();
        let second = builder.build_at(&sensor, 1_500).unwrap();
        let third = builder.build_at(&sensor, 2_500).unwrap();

        assert_eq!(first.timestamp, 2_000);
        assert_eq!(second.timestamp, 2_000);
        assert_eq!(third.timestamp, 2_500);
    }

    #[test]
    fn test_wire_format_field_names() {
        let mut builder = SnapshotBuilder::new("alice");
        let snapshot = builder.build_at(&FixedSensor::default(), 42).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["user_id"], "alice");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["process_name"], "notepad.exe");
        assert_eq!(json["window_title"], "notes.txt - Notepad");
        assert_eq!(json["mouse_idle_seconds"], 5);
        assert_eq!(json["is_fullscreen"], false);
        assert_eq!(json["extra_info"], "exe=C:\\app-4242.exe");
        assert!(json.get("idle_seconds").is_none());
    }

    #[test]
    fn test_empty_extra_info_is_omitted() {
        let snapshot = ActivitySnapshot {
            user_id: "bob".to_string(),
            timestamp: 1,
            process_name: String::new(),
            window_title: String::new(),
            idle_seconds: 0,
            is_fullscreen: false,
            extra_info: String::new(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("extra_info"));
        assert_eq!(object.len(), 6);
    }
}
