//! Log sink setup
//!
//! Console output goes to stderr at the configured level (`RUST_LOG` wins
//! when set). An optional log file receives everything at DEBUG.

use crate::error::{Error, Result};
use crate::types::LogLevel;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Build the console filter for `level`
///
/// `RUST_LOG`, when set and valid, takes precedence.
pub fn console_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()))
}

/// Open (append) the log file, creating its parent directory
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber
///
/// When the log file cannot be opened the console layer is still installed
/// and a warning is emitted.
pub fn init(level: LogLevel, file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter(level));

    let (file_layer, file_error) = match file.map(open_log_file) {
        Some(Ok(handle)) => {
            let layer = fmt::layer()
                .with_writer(Arc::new(handle))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), None)
        }
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging {
            message: e.to_string(),
        })?;

    if let (Some(path), Some(err)) = (file, file_error) {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "Could not open log file, logging to console only"
        );
    } else if let Some(path) = file {
        tracing::debug!(path = %path.display(), "File logging enabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/run.log");

        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_appends() {
        use std::io::Write;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_rejects_directory() {
        let dir = TempDir::new().unwrap();
        assert!(open_log_file(dir.path()).is_err());
    }

    #[test]
    fn test_console_filter_uses_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = console_filter(LogLevel::Warn);
            assert_eq!(filter.to_string(), "warn");
        }
    }
}
