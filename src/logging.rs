//! Diagnostic logging to stderr and an append-only log file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Open `path` for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the default level (`info`, or `debug` when
/// `verbose`). If the log file cannot be opened logging continues on stderr
/// only.
pub fn init(log_path: Option<&Path>, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, open_error) = match log_path.map(|p| (p, open_log_file(p))) {
        Some((_, Ok(file))) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Some((path, Err(e))) => (None, Some((path.to_path_buf(), e))),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some((path, e)) = open_error {
        warn!(path = %path.display(), error = %e, "could not open log file, logging to stderr only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activity-sampler.log");

        writeln!(open_log_file(&path).unwrap(), "first run").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second run").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }
}
