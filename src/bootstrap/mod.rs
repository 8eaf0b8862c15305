//! One-shot host setup run before the sampling loop starts.
//!
//! The sampler registers itself to start at logon. When the host refuses
//! with access denied and the process is not already elevated, it relaunches
//! itself elevated (marked with [`ELEVATED_FLAG`]) and the current process
//! exits.

pub mod autostart;
pub mod elevation;

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

/// Marker argument passed to the elevated relaunch.
pub const ELEVATED_FLAG: &str = "--elevated";

/// Bootstrap error types.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The host refused the write for lack of privileges
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// No auto-start or elevation mechanism on this platform
    #[error("not supported on this platform")]
    Unsupported,
    /// Elevated relaunch could not be started
    #[error("elevation failed: {0}")]
    Elevation(String),
    /// Other operating system failure
    #[error("OS error: {0}")]
    Os(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists the executable into the host's run-at-logon mechanism.
pub trait Registrar {
    fn register(&self) -> Result<(), BootstrapError>;
}

/// Relaunches the current executable with elevated privileges.
pub trait Elevator {
    fn relaunch_elevated(&self) -> Result<(), BootstrapError>;
}

/// Result of [`run_bootstrap`].
#[derive(Debug)]
pub enum BootstrapOutcome {
    /// Auto-start entry written; keep running.
    Registered,
    /// Registration failed in a way elevation cannot fix; keep running.
    RegistrationFailed(BootstrapError),
    /// An elevated copy was started; this process should exit.
    Relaunched,
    /// Elevation itself failed; this process should exit.
    ElevationFailed(BootstrapError),
}

impl BootstrapOutcome {
    /// Whether the caller must exit instead of sampling.
    pub fn should_exit(&self) -> bool {
        matches!(
            self,
            BootstrapOutcome::Relaunched | BootstrapOutcome::ElevationFailed(_)
        )
    }
}

/// Register auto-start, escalating privileges once if the host denies access.
pub fn run_bootstrap(
    registrar: &dyn Registrar,
    elevator: &dyn Elevator,
    already_elevated: bool,
) -> BootstrapOutcome {
    match registrar.register() {
        Ok(()) => {
            info!("auto-start registered");
            BootstrapOutcome::Registered
        }
        Err(BootstrapError::AccessDenied(reason)) if !already_elevated => {
            warn!(%reason, "insufficient privileges for auto-start, relaunching elevated");
            match elevator.relaunch_elevated() {
                Ok(()) => {
                    info!("elevated instance started, exiting");
                    BootstrapOutcome::Relaunched
                }
                Err(e) => {
                    error!(error = %e, "elevation failed");
                    BootstrapOutcome::ElevationFailed(e)
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "auto-start registration failed, continuing without it");
            BootstrapOutcome::RegistrationFailed(e)
        }
    }
}

/// Registrar for the running executable on this host.
#[derive(Debug, Clone)]
pub struct HostRegistrar {
    exe: PathBuf,
}

impl HostRegistrar {
    pub fn new(exe: PathBuf) -> Self {
        Self { exe }
    }

    /// Registrar for the current executable.
    pub fn for_current_exe() -> Result<Self, BootstrapError> {
        Ok(Self::new(autostart::current_exe()?))
    }
}

impl Registrar for HostRegistrar {
    fn register(&self) -> Result<(), BootstrapError> {
        autostart::register(&self.exe)
    }
}

/// Elevator that forwards the original command-line arguments.
#[derive(Debug, Clone)]
pub struct HostElevator {
    args: Vec<String>,
}

impl HostElevator {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl Elevator for HostElevator {
    fn relaunch_elevated(&self) -> Result<(), BootstrapError> {
        elevation::relaunch_elevated(&self.args)
    }
}
