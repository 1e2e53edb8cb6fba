//! Engine metrics
//!
//! Atomic counters for tracking pipeline activity.
//! All operations use relaxed ordering; values are eventually consistent,
//! not real-time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a pipeline instance
///
/// Counters are updated as the scheduler and flow-control calls run and can
/// be read at any time through [`EngineMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Items accepted at the pipeline root
    items_enqueued: AtomicU64,

    /// Handler invocations
    batches_processed: AtomicU64,

    /// Items handed to handlers (sum of batch sizes)
    items_processed: AtomicU64,

    /// Items pushed onto a drain by emit/eject/inject-after
    items_emitted: AtomicU64,

    /// Items re-entered through inject/inject-at
    items_injected: AtomicU64,

    /// Items requeued head-of-line by recycle
    items_recycled: AtomicU64,

    /// Items that bypassed a segment (disabled passthrough or allow reject)
    items_skipped: AtomicU64,

    /// Handler invocations that returned an error
    handler_errors: AtomicU64,

    /// Flow-control calls that failed to resolve an address
    routing_errors: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            items_enqueued: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            items_processed: AtomicU64::new(0),
            items_emitted: AtomicU64::new(0),
            items_injected: AtomicU64::new(0),
            items_recycled: AtomicU64::new(0),
            items_skipped: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            routing_errors: AtomicU64::new(0),
        }
    }

    /// Record items accepted at the root
    #[inline]
    pub fn record_enqueued(&self, count: u64) {
        self.items_enqueued.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one handler invocation over `count` items
    #[inline]
    pub fn record_batch(&self, count: u64) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.items_processed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record items pushed onto a drain
    #[inline]
    pub fn record_emitted(&self, count: u64) {
        self.items_emitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record items re-entered through a pending queue
    #[inline]
    pub fn record_injected(&self, count: u64) {
        self.items_injected.fetch_add(count, Ordering::Relaxed);
    }

    /// Record items requeued head-of-line
    #[inline]
    pub fn record_recycled(&self, count: u64) {
        self.items_recycled.fetch_add(count, Ordering::Relaxed);
    }

    /// Record items that bypassed a segment
    #[inline]
    pub fn record_skipped(&self, count: u64) {
        self.items_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed handler invocation
    #[inline]
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unresolvable address
    #[inline]
    pub fn record_routing_error(&self) {
        self.routing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_enqueued: self.items_enqueued.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            items_processed: self.items_processed.load(Ordering::Relaxed),
            items_emitted: self.items_emitted.load(Ordering::Relaxed),
            items_injected: self.items_injected.load(Ordering::Relaxed),
            items_recycled: self.items_recycled.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            routing_errors: self.routing_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.items_enqueued.store(0, Ordering::Relaxed);
        self.batches_processed.store(0, Ordering::Relaxed);
        self.items_processed.store(0, Ordering::Relaxed);
        self.items_emitted.store(0, Ordering::Relaxed);
        self.items_injected.store(0, Ordering::Relaxed);
        self.items_recycled.store(0, Ordering::Relaxed);
        self.items_skipped.store(0, Ordering::Relaxed);
        self.handler_errors.store(0, Ordering::Relaxed);
        self.routing_errors.store(0, Ordering::Relaxed);
    }

    /// Get handler invocation count
    #[inline]
    pub fn batches_processed(&self) -> u64 {
        self.batches_processed.load(Ordering::Relaxed)
    }

    /// Get handler error count
    #[inline]
    pub fn handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }

    /// Get routing error count
    #[inline]
    pub fn routing_errors(&self) -> u64 {
        self.routing_errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Items accepted at the pipeline root
    pub items_enqueued: u64,
    /// Handler invocations
    pub batches_processed: u64,
    /// Items handed to handlers
    pub items_processed: u64,
    /// Items pushed onto a drain
    pub items_emitted: u64,
    /// Items re-entered through a pending queue
    pub items_injected: u64,
    /// Items requeued head-of-line
    pub items_recycled: u64,
    /// Items that bypassed a segment
    pub items_skipped: u64,
    /// Failed handler invocations
    pub handler_errors: u64,
    /// Unresolvable addresses
    pub routing_errors: u64,
}

impl MetricsSnapshot {
    /// Average items per handler invocation
    ///
    /// Returns None before any batch has been processed.
    #[inline]
    pub fn items_per_batch(&self) -> Option<f64> {
        if self.batches_processed == 0 {
            None
        } else {
            Some(self.items_processed as f64 / self.batches_processed as f64)
        }
    }

    /// Calculate the difference from another snapshot
    ///
    /// Useful for calculating rates over intervals.
    #[inline]
    pub fn diff(&self, previous: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            items_enqueued: self.items_enqueued.saturating_sub(previous.items_enqueued),
            batches_processed: self
                .batches_processed
                .saturating_sub(previous.batches_processed),
            items_processed: self.items_processed.saturating_sub(previous.items_processed),
            items_emitted: self.items_emitted.saturating_sub(previous.items_emitted),
            items_injected: self.items_injected.saturating_sub(previous.items_injected),
            items_recycled: self.items_recycled.saturating_sub(previous.items_recycled),
            items_skipped: self.items_skipped.saturating_sub(previous.items_skipped),
            handler_errors: self.handler_errors.saturating_sub(previous.handler_errors),
            routing_errors: self.routing_errors.saturating_sub(previous.routing_errors),
        }
    }
}
