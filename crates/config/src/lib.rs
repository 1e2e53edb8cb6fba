//! Piper Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use piper_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[global]\nbatch_size = 50").unwrap();
//! assert_eq!(config.global.batch_size, 50);
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [global]
//! batch_size = 100
//!
//! [log]
//! level = "debug"
//! ```
//!
//! # Environment
//!
//! The sole environment input is `PIPER_DEBUG`: when set to a non-zero
//! integer it overrides the resolved debug level of every segment. See
//! [`debug_override`].

mod env;
mod error;
mod global;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use env::{debug_override, DEBUG_ENV};
pub use error::{ConfigError, Result};
pub use global::{GlobalConfig, DEFAULT_BATCH_SIZE};
pub use logging::{LogConfig, LogLevel};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global engine defaults (batch size, debug/verbose levels)
    pub global: GlobalConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.global.validate()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
