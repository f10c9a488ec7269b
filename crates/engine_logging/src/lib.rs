#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the process-wide logger setup used by the binary, a minimal test
//! initializer, and [`redact`] for keeping credentials out of log lines.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Where the process logger writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Terminal only.
    Terminal,
    /// Terminal plus a log file at the given path, truncated on start.
    TerminalAndFile(PathBuf),
}

/// Process logger settings, built once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Maximum level that is emitted.
    pub level: LevelFilter,
    /// Output destination.
    pub destination: LogDestination,
}

impl LogSettings {
    /// `Debug` when `debug` is set, `Info` otherwise, terminal output.
    pub fn for_verbosity(debug: bool) -> Self {
        Self {
            level: if debug {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            destination: LogDestination::Terminal,
        }
    }

    /// Also write to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = LogDestination::TerminalAndFile(path.into());
        self
    }
}

/// Installs the global logger.
///
/// A log file that cannot be created is reported on stderr and skipped; the
/// terminal logger is always installed. Calling this twice is a no-op.
pub fn initialize(settings: &LogSettings) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        settings.level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let LogDestination::TerminalAndFile(path) = &settings.destination {
        if let Some(file_logger) = create_file_logger(path, settings.level, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

/// Masks a secret for logging: keeps the first and last four characters of
/// long values and hides short values entirely.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_edges_of_long_secrets() {
        assert_eq!(redact("abcdefghijklmnopqrstuvwxyz"), "abcd...wxyz");
    }

    #[test]
    fn redact_hides_short_secrets_entirely() {
        assert_eq!(redact("hunter2"), "*******");
        assert_eq!(redact(""), "");
    }

    #[test]
    fn verbosity_selects_level() {
        assert_eq!(LogSettings::for_verbosity(true).level, LevelFilter::Debug);
        assert_eq!(LogSettings::for_verbosity(false).level, LevelFilter::Info);
    }

    #[test]
    fn file_logger_is_skipped_when_path_is_unwritable() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("no_such_dir").join("harvester.log");
        assert!(create_file_logger(&missing, LevelFilter::Info, Config::default()).is_none());

        let ok = temp.path().join("harvester.log");
        assert!(create_file_logger(&ok, LevelFilter::Info, Config::default()).is_some());
    }
}
