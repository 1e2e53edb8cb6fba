//! Log level setting
//!
//! The engine emits through its logger facade; the one thing the host
//! process needs from configuration is how much of that output to keep.
//! [`LogLevel::as_filter`] turns the setting into the directive a
//! `tracing` subscriber filter understands.

use serde::Deserialize;

/// Verbosity threshold for the host's tracing subscriber
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-batch scheduling detail
    Trace,
    /// Engine debugging output
    Debug,
    /// Normal operation (default)
    #[default]
    Info,
    /// Warnings and errors only
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// The `tracing` filter directive for this level
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Threshold below which output is discarded
    /// Default: info
    pub level: LogLevel,
}
