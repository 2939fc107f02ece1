//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! The interactive viewer owns the terminal, so logs either go to a file
//! (`--log-file`) or are not collected at all. Non-interactive `--print`
//! runs log to stderr.
//!
//! # Log Levels
//!
//! - `warn`: skipped git output records, revisions not found, failed loads
//! - `info`: file loads and revision moves
//! - `debug`: every git invocation with its duration

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Drop everything; no subscriber is installed.
    Off,
    Stderr,
    File(PathBuf),
}

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub target: LogTarget,
}

impl LogConfig {
    /// Map CLI verbosity to a level.
    ///
    /// - 0 (no `-v`): warn
    /// - 1 (`-v`): info
    /// - 2 (`-vv`): debug
    /// - 3+: trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8, target: LogTarget) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { level, target }
    }
}

/// Install the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let filter = build_env_filter(config.level);

    let installed = match &config.target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .try_init()
        }
    };

    installed.map_err(io::Error::other)
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG`.
fn build_env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();

    // External crates stay at warn to keep the log readable
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,git_rewind={level_str}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(LogConfig::from_verbosity(0, LogTarget::Off).level, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(1, LogTarget::Off).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(2, LogTarget::Off).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9, LogTarget::Off).level, Level::TRACE);
    }

    #[test]
    fn off_installs_nothing() {
        let config = LogConfig::from_verbosity(0, LogTarget::Off);
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::from_verbosity(
            0,
            LogTarget::File(dir.path().join("missing").join("log.txt")),
        );
        assert!(init_logging(&config).is_err());
    }
}
