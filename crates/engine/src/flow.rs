//! Flow control
//!
//! `Flow` is the handle a handler receives alongside its batch: the only
//! way to move items onward. Each call names a destination relative to
//! the current segment:
//!
//! ```text
//! emit         -> own drain (the next stage)
//! eject        -> enclosing container's drain (skip the rest of it)
//! inject       -> enclosing container's head (re-run it from the top)
//! recycle      -> own pending queue, head-of-line
//! inject_at    -> named segment's pending queue
//! inject_after -> named segment's drain
//! ```
//!
//! `inject` and `inject_at` go through enqueue and therefore re-apply the
//! target's enablement and allow gating; the drain-side calls push
//! directly. Items a handler routes nowhere are dropped.

use piper_address::Path;

use crate::error::{PipelineError, Result};
use crate::instance::{Pipeline, SegmentId};

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;

/// Handler-side handle into the running pipeline
///
/// Borrows the pipeline for the duration of one handler invocation; the
/// scheduler will not advance until the handler returns.
pub struct Flow<'p, T, A = ()> {
    pipeline: &'p mut Pipeline<T, A>,
    segment: SegmentId,
}

impl<'p, T, A> Flow<'p, T, A> {
    pub(crate) fn new(pipeline: &'p mut Pipeline<T, A>, segment: SegmentId) -> Self {
        Self { pipeline, segment }
    }

    /// Id of the segment whose handler is running
    #[inline]
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.segment
    }

    /// Path of the segment whose handler is running
    #[must_use]
    pub fn path(&self) -> &Path {
        self.pipeline.path(self.segment)
    }

    /// Label of the segment whose handler is running
    #[must_use]
    pub fn label(&self) -> &str {
        self.pipeline.label(self.segment)
    }

    /// The init arguments recorded on the pipeline root
    #[must_use]
    pub fn args(&self) -> &A {
        self.pipeline.args()
    }

    /// The segment's resolved batch size
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.pipeline.resolved_batch_size(self.segment)
    }

    /// Items still pending in the segment's own queue
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pipeline.pending_at(self.segment)
    }

    /// Push items onto the segment's drain - the next stage
    pub fn emit(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.pipeline.metrics.record_emitted(items.len() as u64);
        let drain = self.pipeline.nodes[self.segment.as_usize()].drain;
        self.pipeline.queues[drain.as_usize()].enqueue(items);
    }

    /// Push items onto the enclosing container's drain, skipping the rest
    /// of it; at the root this is the same as `emit`
    pub fn eject(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.pipeline.metrics.record_emitted(items.len() as u64);
        let node = &self.pipeline.nodes[self.segment.as_usize()];
        let drain = match node.parent {
            Some(parent) => self.pipeline.nodes[parent.as_usize()].drain,
            None => node.drain,
        };
        self.pipeline.queues[drain.as_usize()].enqueue(items);
    }

    /// Re-enter the enclosing container from its head; at the root this
    /// re-enters the segment itself
    ///
    /// Goes through enqueue, so the target's gating applies again.
    pub fn inject(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.pipeline.metrics.record_injected(items.len() as u64);
        let target = self.pipeline.nodes[self.segment.as_usize()]
            .parent
            .unwrap_or(self.segment);
        self.pipeline.enqueue_at(target, items);
    }

    /// Put items back at the head of the segment's own queue
    ///
    /// Recycled items keep their relative order and run ahead of anything
    /// still queued.
    pub fn recycle(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        self.pipeline.metrics.record_recycled(items.len() as u64);
        let queue = self.pipeline.nodes[self.segment.as_usize()].queue;
        self.pipeline.queues[queue.as_usize()].requeue(items);
    }

    /// Enqueue items at the segment named by `address`
    ///
    /// Goes through enqueue, so the target's gating applies.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Unroutable`] when the address resolves to
    /// nothing; the failure is also raised on the ERROR log channel.
    pub fn inject_at(&mut self, address: &str, items: Vec<T>) -> Result<()> {
        match self.pipeline.find_segment_from(self.segment, address) {
            Some(target) => {
                self.pipeline.metrics.record_injected(items.len() as u64);
                self.pipeline.enqueue_at(target, items);
                Ok(())
            }
            None => Err(self.unroutable(address)),
        }
    }

    /// Push items onto the drain of the segment named by `address`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Unroutable`] when the address resolves to
    /// nothing; the failure is also raised on the ERROR log channel.
    pub fn inject_after(&mut self, address: &str, items: Vec<T>) -> Result<()> {
        match self.pipeline.find_segment_from(self.segment, address) {
            Some(target) => {
                self.pipeline.metrics.record_emitted(items.len() as u64);
                let drain = self.pipeline.nodes[target.as_usize()].drain;
                self.pipeline.queues[drain.as_usize()].enqueue(items);
                Ok(())
            }
            None => Err(self.unroutable(address)),
        }
    }

    /// Resolve an address as seen from this segment
    #[must_use]
    pub fn find_segment(&mut self, address: &str) -> Option<SegmentId> {
        self.pipeline.find_segment_from(self.segment, address)
    }

    /// Log on the INFO channel (fires when debug or verbose is non-zero)
    pub fn info(&self, message: &str) {
        self.pipeline.log_info(self.segment, message);
    }

    /// Log on the DEBUG channel (fires when debug is non-zero)
    pub fn debug(&self, message: &str) {
        self.pipeline.log_debug(self.segment, message);
    }

    /// Raise a non-fatal warning
    pub fn warn(&self, message: &str) {
        self.pipeline.log_warn(self.segment, message);
    }

    /// Raise a fatal error: logs on the ERROR channel and returns the
    /// error for the handler to propagate
    #[must_use]
    pub fn error(&self, message: &str) -> PipelineError {
        self.pipeline.log_error(self.segment, message);
        PipelineError::handler(self.path().to_string(), message)
    }

    fn unroutable(&mut self, address: &str) -> PipelineError {
        self.pipeline.metrics.record_routing_error();
        let err = PipelineError::unroutable(address);
        self.pipeline.log_error(self.segment, &err.to_string());
        err
    }
}
