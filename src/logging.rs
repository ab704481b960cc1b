//! Structured logging setup using the tracing crate.
//!
//! Logs go to stderr so that command output on stdout stays clean.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty console output with colors
    Pretty,
    /// Compact single-line output
    #[default]
    Compact,
    /// JSON structured output
    Json,
}

/// The global subscriber could not be installed.
#[derive(Error, Debug)]
#[error("Failed to initialize logging: {0}")]
pub struct LoggingError(String);

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Output format
    pub format: LogFormat,
    /// ANSI colors
    pub ansi_colors: bool,
    /// Include the event target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_verbosity(0)
    }
}

impl LoggingConfig {
    /// Map a `-v` count to a filter: warn, info, debug, then trace.
    pub fn from_verbosity(verbosity: u8) -> Self {
        let filter = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            filter: filter.to_string(),
            format: LogFormat::Compact,
            ansi_colors: true,
            with_target: verbosity >= 3,
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let base = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(base.pretty().with_ansi(config.ansi_colors))
            .try_init(),
        LogFormat::Compact => registry
            .with(base.compact().with_ansi(config.ansi_colors))
            .try_init(),
        LogFormat::Json => registry.with(base.json()).try_init(),
    };

    result.map_err(|e| LoggingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).filter, "warn");
        assert_eq!(LoggingConfig::from_verbosity(1).filter, "info");
        assert_eq!(LoggingConfig::from_verbosity(2).filter, "debug");
        assert_eq!(LoggingConfig::from_verbosity(7).filter, "trace");
        assert!(LoggingConfig::from_verbosity(3).with_target);
    }

    #[test]
    fn test_format_from_toml() {
        let config: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
