//! Logger facade
//!
//! The engine emits through four level calls, always with the segment path
//! as context. Level gating happens engine-side: the INFO channel fires
//! only when the segment's resolved debug or verbose level is non-zero,
//! DEBUG only when debug is non-zero, while WARN and ERROR always fire.
//! Implementations just write.

use parking_lot::Mutex;
use piper_address::Path;

/// Consumer-facing logging interface
///
/// The default implementation forwards to `tracing`; embedders can swap in
/// their own sink at pipeline construction.
pub trait Logger: Send + Sync {
    /// Normal-operation message
    fn info(&self, segment: &Path, message: &str);

    /// Debugging detail
    fn debug(&self, segment: &Path, message: &str);

    /// Non-fatal warning
    fn warn(&self, segment: &Path, message: &str);

    /// Fatal condition; the calling handler aborts after raising this
    fn error(&self, segment: &Path, message: &str);
}

/// Built-in logger that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, segment: &Path, message: &str) {
        tracing::info!(segment = %segment, "{message}");
    }

    fn debug(&self, segment: &Path, message: &str) {
        tracing::debug!(segment = %segment, "{message}");
    }

    fn warn(&self, segment: &Path, message: &str) {
        tracing::warn!(segment = %segment, "{message}");
    }

    fn error(&self, segment: &Path, message: &str) {
        tracing::error!(segment = %segment, "{message}");
    }
}

/// A single captured log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Level name: "info", "debug", "warn" or "error"
    pub level: &'static str,
    /// Path of the segment that emitted the message
    pub segment: String,
    /// The message text
    pub message: String,
}

/// In-memory logger that records every call
///
/// Useful in tests and embeddings that want to inspect engine output
/// rather than print it.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Create an empty logger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records captured so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Drop all captured records
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, level: &'static str, segment: &Path, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            segment: segment.to_string(),
            message: message.to_owned(),
        });
    }
}

impl Logger for MemoryLogger {
    fn info(&self, segment: &Path, message: &str) {
        self.push("info", segment, message);
    }

    fn debug(&self, segment: &Path, message: &str) {
        self.push("debug", segment, message);
    }

    fn warn(&self, segment: &Path, message: &str) {
        self.push("warn", segment, message);
    }

    fn error(&self, segment: &Path, message: &str) {
        self.push("error", segment, message);
    }
}
