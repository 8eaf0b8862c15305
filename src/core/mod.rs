//! Core functionality for the activity sampler.
//!
//! This module contains:
//! - Snapshot building from a host sensor
//! - Change detection against the last published snapshot

pub mod change;
pub mod snapshot;

// Re-export commonly used types
pub use change::is_changed;
pub use snapshot::{ActivitySnapshot, BuildError, SnapshotBuilder};
