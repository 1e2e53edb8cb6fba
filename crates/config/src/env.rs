//! Environment override for the debug level
//!
//! `PIPER_DEBUG` is the single environment variable the engine honors.
//! Every other knob goes through the explicit configuration surface.

use std::env;

/// Name of the debug-override environment variable
pub const DEBUG_ENV: &str = "PIPER_DEBUG";

/// Read the global debug override from the environment
///
/// Returns `Some(level)` when `PIPER_DEBUG` is set to a non-zero integer,
/// clamped into the `1..=255` range. Zero, unset, and unparsable values
/// all mean "no override".
#[must_use]
pub fn debug_override() -> Option<u8> {
    let raw = env::var(DEBUG_ENV).ok()?;
    let value: i64 = raw.trim().parse().ok()?;
    if value == 0 {
        return None;
    }
    Some(value.unsigned_abs().min(u8::MAX as u64) as u8)
}
