//! Global engine defaults
//!
//! These settings are the fallback of the per-segment configuration
//! inheritance chain: a segment that sets nothing, whose ancestors set
//! nothing, resolves to these values.

use serde::Deserialize;

use crate::{ConfigError, Result};

/// Default batch size when no segment or ancestor sets one
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Global defaults that apply to every segment
///
/// All fields have sensible defaults - you only need to specify what you
/// want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Fallback batch size (items per handler invocation)
    /// Default: 200
    pub batch_size: usize,

    /// Fallback debug level; 0 disables the DEBUG channel
    /// Default: 0
    pub debug: u8,

    /// Fallback verbose level; with debug at 0, a non-zero value still
    /// enables the INFO channel
    /// Default: 0
    pub verbose: u8,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            debug: 0,
            verbose: 0,
        }
    }
}

impl GlobalConfig {
    /// Validate the global defaults
    ///
    /// # Errors
    ///
    /// Returns an error if `batch_size` is zero; a batch size must be a
    /// positive integer.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "global",
                "batch_size",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
