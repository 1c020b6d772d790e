//! Tracing setup for CLI commands and the daemon
//!
//! All output goes to stderr; stdout is left for command results. The daemon
//! also writes a plain-text log file so `mcps daemon logs` works after the
//! supervisor has stopped relaying its output. The file rotates daily and
//! only the most recent week is kept.
//!
//! Set `LOG_FORMAT=json` for structured JSON output. `RUST_LOG` overrides the
//! verbosity flags.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Daemon log files are named `daemon.<date>.log`
const LOG_PREFIX: &str = "daemon";
const LOG_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 7;

/// Most recent daemon log file in `dir`, if any
pub fn latest_log_file(dir: &Path) -> Option<PathBuf> {
    let prefix = format!("{}.", LOG_PREFIX);
    let suffix = format!(".{}", LOG_SUFFIX);
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(&suffix)
        })
        // Dates in the name sort chronologically
        .max_by_key(|entry| entry.file_name())
        .map(|entry| entry.path())
}

/// Keeps the non-blocking file writer alive; hold it until exit.
#[allow(dead_code)]
pub struct LogGuard {
    file_guard: Option<WorkerGuard>,
}

/// Map `-v` counts onto a level, starting from `base`
fn level_name(verbose: u8, base: u8) -> &'static str {
    match base.saturating_add(verbose) {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn json_requested() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Logging for short-lived CLI commands (warn by default)
pub fn init_cli(verbose: u8) -> LogGuard {
    init(level_name(verbose, 0), None)
}

/// Logging for the daemon process (info by default, plus a log file)
pub fn init_daemon(verbose: u8, log_dir: &Path) -> LogGuard {
    init(level_name(verbose, 1), Some(log_dir))
}

fn init(level: &str, log_dir: Option<&Path>) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mcps={}", level)));

    let json = json_requested();
    let mut layers = Vec::new();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let stderr_layer = if json {
        stderr_layer.json().boxed()
    } else {
        stderr_layer.boxed()
    };
    layers.push(stderr_layer);

    let mut file_guard = None;
    if let Some(dir) = log_dir {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_PREFIX)
            .filename_suffix(LOG_SUFFIX)
            .max_log_files(MAX_LOG_FILES)
            .build(dir);
        match appender {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                file_guard = Some(guard);

                let file_layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer);
                let file_layer = if json {
                    file_layer.json().boxed()
                } else {
                    file_layer.boxed()
                };
                layers.push(file_layer);
            }
            Err(e) => eprintln!("Failed to open log file in {}: {}", dir.display(), e),
        }
    }

    // try_init: tests may install a subscriber more than once
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard { file_guard }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_warn() {
        assert_eq!(level_name(0, 0), "warn");
        assert_eq!(level_name(1, 0), "info");
        assert_eq!(level_name(2, 0), "debug");
        assert_eq!(level_name(9, 0), "trace");
    }

    #[test]
    fn test_daemon_defaults_to_info() {
        assert_eq!(level_name(0, 1), "info");
        assert_eq!(level_name(1, 1), "debug");
    }

    #[test]
    fn test_latest_log_file_picks_newest_day() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "daemon.2026-10-13.log",
            "daemon.2026-10-15.log",
            "daemon.2026-10-14.log",
            "other.2026-10-16.log",
            "daemon.2026-10-17.txt",
        ] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        assert_eq!(
            latest_log_file(dir.path()),
            Some(dir.path().join("daemon.2026-10-15.log"))
        );
    }

    #[test]
    fn test_latest_log_file_without_logs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(latest_log_file(dir.path()), None);
        assert_eq!(latest_log_file(&dir.path().join("missing")), None);
    }
}
