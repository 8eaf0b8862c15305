//! Sampling loop: sample, compare, maybe publish, wait.
//!
//! The [`Driver`] owns the only mutable state of the sampler, the last
//! published snapshot and the current backoff interval, and touches it from a
//! single thread. One tick runs to completion before the next begins, so at
//! most one publish is ever in flight.
//!
//! ```text
//!  Idle ──▶ Sampling ──▶ Comparing ──▶ Publishing ──ok──▶ Idle
//!   ▲          │             │             │
//!   │    no window       unchanged       failed
//!   │          ▼             ▼             ▼
//!   └──────── Idle ◀──────── Idle      BackoffWait ──▶ Idle
//! ```

use crate::core::{is_changed, ActivitySnapshot, BuildError, SnapshotBuilder};
use crate::sensor::Sensor;
use crate::transparency::SharedActivityLog;
use crate::uploader::Publisher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Granularity of interruptible waits.
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Where the driver is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sampling,
    Comparing,
    Publishing,
    BackoffWait,
}

/// Exponential backoff without jitter, bounded to `[base, max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff starting at `base`. A `max` below `base` is raised to it.
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Current retry delay.
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Register a failure: returns the delay to wait now and doubles the
    /// delay for the next failure, capped at `max`.
    pub fn fail(&mut self) -> Duration {
        let wait = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        wait
    }

    /// Return to the base interval after a success.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Process-wide scheduler state, owned by exactly one [`Driver`].
#[derive(Debug, Clone)]
pub struct SchedulerState {
    /// Last snapshot the collector acknowledged
    pub last_published: Option<ActivitySnapshot>,
    /// Delay to apply after the next publish failure
    pub backoff: Backoff,
}

impl SchedulerState {
    /// Initial state: nothing published, backoff at base.
    pub fn new(base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            last_published: None,
            backoff: Backoff::new(base_interval, max_interval),
        }
    }
}

/// What one tick did and how long to wait before the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No foreground window; nothing sampled.
    Skipped { wait: Duration },
    /// Sample equal to the last published one; no network traffic.
    Unchanged { wait: Duration },
    /// Sample delivered and now the baseline.
    Published { wait: Duration },
    /// Delivery failed; the sample was dropped.
    Failed { wait: Duration, error: String },
}

impl TickOutcome {
    /// Delay before the next tick.
    pub fn wait(&self) -> Duration {
        match self {
            TickOutcome::Skipped { wait }
            | TickOutcome::Unchanged { wait }
            | TickOutcome::Published { wait }
            | TickOutcome::Failed { wait, .. } => *wait,
        }
    }
}

/// The sampling loop over a sensor and a publisher.
pub struct Driver<S: Sensor, P: Publisher> {
    sensor: S,
    publisher: P,
    builder: SnapshotBuilder,
    state: SchedulerState,
    phase: Phase,
    activity_log: Option<SharedActivityLog>,
}

impl<S: Sensor, P: Publisher> Driver<S, P> {
    /// Create a driver in its initial state.
    pub fn new(
        sensor: S,
        publisher: P,
        builder: SnapshotBuilder,
        base_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        Self {
            sensor,
            publisher,
            builder,
            state: SchedulerState::new(base_interval, max_interval),
            phase: Phase::Idle,
            activity_log: None,
        }
    }

    /// Count every tick outcome in `log`.
    pub fn with_activity_log(mut self, log: SharedActivityLog) -> Self {
        self.activity_log = Some(log);
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_published(&self) -> Option<&ActivitySnapshot> {
        self.state.last_published.as_ref()
    }

    /// Current backoff interval.
    pub fn backoff_interval(&self) -> Duration {
        self.state.backoff.current()
    }

    /// Run one full cycle without waiting.
    ///
    /// Never fails: every error is logged and folded into the outcome.
    pub fn tick(&mut self) -> TickOutcome {
        let base = self.state.backoff.base();
        self.with_log(|log| log.record_tick());

        self.phase = Phase::Sampling;
        let candidate = match self.builder.build(&self.sensor) {
            Ok(snapshot) => snapshot,
            Err(BuildError::NoActiveWindow) => {
                info!("no foreground window, waiting");
                self.with_log(|log| log.record_skipped());
                self.phase = Phase::Idle;
                return TickOutcome::Skipped { wait: base };
            }
        };

        self.phase = Phase::Comparing;
        if !is_changed(&candidate, self.state.last_published.as_ref()) {
            debug!("activity unchanged, nothing to upload");
            self.with_log(|log| log.record_unchanged());
            self.phase = Phase::Idle;
            return TickOutcome::Unchanged { wait: base };
        }

        self.phase = Phase::Publishing;
        match self.publisher.publish(&candidate) {
            Ok(()) => {
                info!(
                    process = %candidate.process_name,
                    title = %candidate.window_title,
                    idle_secs = candidate.idle_seconds,
                    fullscreen = candidate.is_fullscreen,
                    "activity published"
                );
                self.with_log(|log| log.record_published(candidate.timestamp));
                self.state.last_published = Some(candidate);
                self.state.backoff.reset();
                self.phase = Phase::Idle;
                TickOutcome::Published { wait: base }
            }
            Err(e) => {
                let wait = self.state.backoff.fail();
                warn!(
                    error = %e,
                    retry_in_secs = wait.as_secs(),
                    "upload failed, retrying later"
                );
                self.with_log(|log| log.record_failed());
                self.phase = Phase::BackoffWait;
                TickOutcome::Failed {
                    wait,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Tick and wait until `running` is cleared.
    ///
    /// While `is_paused` returns true no sampling happens; the driver only
    /// waits one base interval at a time.
    pub fn run<F>(&mut self, running: &AtomicBool, mut is_paused: F)
    where
        F: FnMut() -> bool,
    {
        while running.load(Ordering::SeqCst) {
            let wait = if is_paused() {
                debug!("sampling paused");
                self.state.backoff.base()
            } else {
                self.tick().wait()
            };

            wait_while_running(wait, running);
            self.phase = Phase::Idle;
        }
    }

    fn with_log(&self, f: impl FnOnce(&SharedActivityLog)) {
        if let Some(ref log) = self.activity_log {
            f(log);
        }
    }
}

/// Sleep for `duration`, returning early once `running` is cleared.
pub fn wait_while_running(duration: Duration, running: &AtomicBool) {
    let mut remaining = duration;
    while !remaining.is_zero() && running.load(Ordering::SeqCst) {
        let slice = remaining.min(WAIT_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(1800));

        let waits: Vec<u64> = (0..7).map(|_| backoff.fail().as_secs()).collect();
        assert_eq!(waits, vec![60, 120, 240, 480, 960, 1800, 1800]);
        assert_eq!(backoff.current(), Duration::from_secs(1800));
    }

    #[test]
    fn test_backoff_after_n_failures() {
        let base = Duration::from_secs(60);
        let max = Duration::from_secs(1800);
        for n in 0..10u32 {
            let mut backoff = Backoff::new(base, max);
            for _ in 0..n {
                backoff.fail();
            }
            let expected = (60u64 * 2u64.pow(n)).min(1800);
            assert_eq!(backoff.current().as_secs(), expected, "after {n} failures");
        }
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(1800));
        backoff.fail();
        backoff.fail();
        backoff.reset();
        assert_eq!(backoff.fail(), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_max_below_base_is_raised() {
        let backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(10));
        assert_eq!(backoff.max(), Duration::from_secs(60));
    }

    #[test]
    fn test_wait_returns_when_stopped() {
        let running = AtomicBool::new(false);
        let start = std::time::Instant::now();
        wait_while_running(Duration::from_secs(30), &running);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
