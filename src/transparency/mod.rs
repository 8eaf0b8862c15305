//! Transparency module for the activity sampler.
//!
//! This module tracks what the sampler has done (ticks, publishes, failures)
//! so an operator can audit a running agent without reading the log file.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, ActivityLog, ActivityStats,
    SharedActivityLog,
};
