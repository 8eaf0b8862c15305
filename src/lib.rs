//! Activity Sampler - desktop activity reporting for a single host.
//!
//! This library samples the foreground application of the interactive
//! desktop session once per interval and reports each change to a remote
//! collector over HTTP.
//!
//! # Guarantees
//!
//! - **No duplicate reports**: an unchanged sample never produces network traffic
//! - **Latest state only**: a failed upload is dropped, never queued; the next
//!   tick samples the host again
//! - **Bounded retry**: failures back off exponentially up to a ceiling and a
//!   success resets the delay
//! - **Never crashes on a bad tick**: sensor and upload errors are logged
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Activity Sampler                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Sensor    │──▶│  Snapshot   │──▶│   Change    │       │
//! │  │ (per host)  │   │   Builder   │   │  Detector   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │ changed      │
//! │  ┌─────────────┐                     ┌──────▼──────┐       │
//! │  │   Driver    │◀────── ok / err ────│  Uploader   │──▶ HTTP
//! │  │ (backoff)   │                     │  (1 POST)   │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use activity_sampler::{
//!     BlockingCollectorClient, Driver, HostSensor, SnapshotBuilder, UploadConfig,
//! };
//! use std::sync::atomic::AtomicBool;
//! use std::time::Duration;
//!
//! let client = BlockingCollectorClient::new(UploadConfig::new(
//!     "https://collector.example.com/api/activity",
//!     Duration::from_secs(10),
//! ))
//! .expect("Failed to create client");
//!
//! let mut driver = Driver::new(
//!     HostSensor::new(),
//!     client,
//!     SnapshotBuilder::new("alice"),
//!     Duration::from_secs(60),
//!     Duration::from_secs(1800),
//! );
//!
//! let running = AtomicBool::new(true);
//! driver.run(&running, || false);
//! ```

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod driver;
pub mod logging;
pub mod sensor;
pub mod transparency;
pub mod uploader;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{is_changed, ActivitySnapshot, BuildError, SnapshotBuilder};
pub use driver::{Backoff, Driver, Phase, SchedulerState, TickOutcome};
pub use sensor::{HostSensor, ProcessIdentity, Sensor, SensorError, WindowHandle};
pub use transparency::{ActivityLog, ActivityStats, SharedActivityLog};
pub use uploader::{BlockingCollectorClient, CollectorClient, Publisher, UploadConfig, UploadError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collection notice that can be displayed to users.
pub const COLLECTION_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              ACTIVITY SAMPLER - COLLECTION NOTICE                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent reports desktop activity to a configured collector.  ║
║                                                                  ║
║  ✓ WHAT WE CAPTURE (once per interval, only when it changes):    ║
║    • The session user name                                       ║
║    • The foreground application and its window title             ║
║    • The application's executable path and command line          ║
║    • Seconds since the last keyboard or mouse input              ║
║    • Whether the foreground window is fullscreen                 ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Which keys you press                                        ║
║    • Where your cursor is                                        ║
║    • Any screen content                                          ║
║                                                                  ║
║  Samples are not stored locally. A failed upload is dropped.     ║
║                                                                  ║
║  You can view sampler statistics anytime with:                   ║
║    activity-sampler status                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
