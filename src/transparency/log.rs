//! Persisted counters describing what the sampler has done.
//!
//! The log records how many ticks ran and what became of them, never the
//! sampled content itself. It is shown by `activity-sampler status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Sampler activity counters for the current and previous sessions.
#[derive(Debug)]
pub struct ActivityLog {
    /// Ticks started
    ticks: AtomicU64,
    /// Ticks skipped because no window had focus
    skipped: AtomicU64,
    /// Samples equal to the last published one
    unchanged: AtomicU64,
    /// Successful publishes
    published: AtomicU64,
    /// Failed publishes
    failed: AtomicU64,
    /// Last successful publish, epoch ms (0 if never)
    last_publish_ms: AtomicI64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    /// Create a new activity log.
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            unchanged: AtomicU64::new(0),
            published: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            last_publish_ms: AtomicI64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that continues the counts stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!(error = %e, "could not load previous sampler stats");
        }

        log
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered snapshot captured at `timestamp_ms`.
    pub fn record_published(&self, timestamp_ms: i64) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.last_publish_ms.store(timestamp_ms, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        let last_ms = self.last_publish_ms.load(Ordering::Relaxed);
        ActivityStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_published_at: (last_ms > 0)
                .then(|| DateTime::<Utc>::from_timestamp_millis(last_ms))
                .flatten(),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let last = stats
            .last_published_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        format!(
            "Sampler Statistics:\n\
             - Ticks: {}\n\
             - Skipped (no active window): {}\n\
             - Unchanged samples: {}\n\
             - Published: {}\n\
             - Failed publishes: {}\n\
             - Last publish: {}\n\
             - Session duration: {} seconds",
            stats.ticks,
            stats.skipped,
            stats.unchanged,
            stats.published,
            stats.failed,
            last,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                ticks: stats.ticks,
                skipped: stats.skipped,
                unchanged: stats.unchanged,
                published: stats.published,
                failed: stats.failed,
                last_publish_ms: self.last_publish_ms.load(Ordering::Relaxed),
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.ticks.store(persisted.ticks, Ordering::Relaxed);
                self.skipped.store(persisted.skipped, Ordering::Relaxed);
                self.unchanged.store(persisted.unchanged, Ordering::Relaxed);
                self.published.store(persisted.published, Ordering::Relaxed);
                self.failed.store(persisted.failed, Ordering::Relaxed);
                self.last_publish_ms
                    .store(persisted.last_publish_ms, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of sampler statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub ticks: u64,
    pub skipped: u64,
    pub unchanged: u64,
    pub published: u64,
    pub failed: u64,
    pub last_published_at: Option<DateTime<Utc>>,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    ticks: u64,
    skipped: u64,
    unchanged: u64,
    published: u64,
    failed: u64,
    #[serde(default)]
    last_publish_ms: i64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

/// Create a new shared activity log.
pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

/// Create a new shared activity log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_log_counting() {
        let log = ActivityLog::new();

        log.record_tick();
        log.record_tick();
        log.record_skipped();
        log.record_unchanged();
        log.record_failed();
        log.record_published(1_700_000_000_000);

        let stats = log.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(
            stats.last_published_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn test_summary_format() {
        let log = ActivityLog::new();
        let summary = log.summary();

        assert!(summary.contains("Ticks: 0"));
        assert!(summary.contains("Failed publishes"));
        assert!(summary.contains("Last publish: never"));
    }

    #[test]
    fn test_stats_persist_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats").join("activity_stats.json");

        let log = ActivityLog::with_persistence(path.clone());
        log.record_tick();
        log.record_published(5_000);
        log.save().unwrap();

        let reloaded = ActivityLog::with_persistence(path);
        let stats = reloaded.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(
            stats.last_published_at.map(|t| t.timestamp_millis()),
            Some(5_000)
        );
    }
}
