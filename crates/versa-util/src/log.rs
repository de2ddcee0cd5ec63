//! Logging setup using tracing.
//!
//! Every versa binary and server calls [`init`] once at startup. Library
//! crates only emit events through the `tracing` macros.

use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to print logs to stderr.
    pub print: bool,
    /// Log level used when `RUST_LOG` is not set.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Whether to emit ANSI colors.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            print: true,
            level: LogLevel::Info,
            include_location: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Build a config for the given level name, falling back to `Info`.
    pub fn with_level_name(mut self, level: Option<&str>) -> Self {
        if let Some(level) = level.and_then(LogLevel::parse) {
            self.level = level;
        }
        self
    }
}

/// Initialize logging with the given configuration.
///
/// Returns `false` if a global subscriber was already installed (for
/// example by a test harness); the existing subscriber is kept.
pub fn init(config: LogConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.print {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_target(true)
            .with_level(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        subscriber.with(fmt_layer).try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    }
}

/// Get the default data directory for the JSON storage backend.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("versa"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("invalid"), None);
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_with_level_name() {
        let config = LogConfig::default().with_level_name(Some("trace"));
        assert_eq!(config.level, LogLevel::Trace);

        let config = LogConfig::default().with_level_name(Some("nonsense"));
        assert_eq!(config.level, LogLevel::Info);

        let config = LogConfig::default().with_level_name(None);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        let config = LogConfig {
            print: false,
            ..LogConfig::default()
        };
        let _ = init(config.clone());
        assert!(!init(config));
    }
}
