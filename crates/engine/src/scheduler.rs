//! Pressure-driven batch scheduler
//!
//! One scheduling step picks a single leaf and runs its handler over one
//! batch. Leaf choice is by pressure - the fill percentage of a leaf's
//! pending queue against its batch size:
//!
//! - a container first looks for children at or over a full batch and
//!   takes the *rightmost* such child, finishing work closest to the
//!   output before refilling the head;
//! - otherwise it takes the child with the highest pressure, leftmost on
//!   ties, so slow stages still advance before any stage fills up.
//!
//! `prepare` repeats scheduling steps until enough items are ready at the
//! output; `flush` repeats until nothing is pending anywhere.

use crate::error::{PipelineError, Result};
use crate::instance::{NodeKind, Pipeline, SegmentId};

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;

/// Pressure value of a leaf holding exactly one full batch
pub const FULL_BATCH: usize = 100;

impl<T, A> Pipeline<T, A> {
    /// Scheduling pressure of a segment
    ///
    /// Zero when nothing is pending; otherwise the percentage of a full
    /// batch, floored, never below 1, saturating past 100 when overfull.
    /// A container reports the maximum pressure among its children.
    #[must_use]
    pub fn pressure(&self, id: SegmentId) -> usize {
        match &self.nodes[id.as_usize()].kind {
            NodeKind::Process { .. } => {
                let pending = self.queues[self.nodes[id.as_usize()].queue.as_usize()].ready();
                if pending == 0 {
                    0
                } else {
                    ((pending * FULL_BATCH) / self.resolved_batch_size(id)).max(1)
                }
            }
            NodeKind::Pipeline { children, .. } => children
                .iter()
                .map(|&child| self.pressure(child))
                .max()
                .unwrap_or(0),
        }
    }

    /// Pick the leaf the next scheduling step should advance
    fn select_leaf(&self, id: SegmentId) -> Option<SegmentId> {
        match &self.nodes[id.as_usize()].kind {
            NodeKind::Process { .. } => (self.pressure(id) > 0).then_some(id),
            NodeKind::Pipeline { children, .. } => {
                // Rightmost child with a full batch drains the tail first.
                if let Some(&full) = children
                    .iter()
                    .rev()
                    .find(|&&child| self.pressure(child) >= FULL_BATCH)
                {
                    return self.select_leaf(full);
                }
                // Otherwise the fullest child; strict comparison keeps the
                // leftmost on ties.
                let mut best: Option<(SegmentId, usize)> = None;
                for &child in children {
                    let pressure = self.pressure(child);
                    if pressure > best.map_or(0, |(_, b)| b) {
                        best = Some((child, pressure));
                    }
                }
                best.and_then(|(child, _)| self.select_leaf(child))
            }
        }
    }

    /// Run one scheduling step
    ///
    /// Picks a leaf by pressure and invokes its handler over one batch, or
    /// forwards the whole pending queue of a disabled leaf to its drain.
    /// Returns whether any work was performed.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error. The batch already dequeued for the
    /// failed invocation is lost; the pipeline itself remains usable.
    pub fn process_batch(&mut self) -> Result<bool> {
        let Some(leaf) = self.select_leaf(self.root) else {
            return Ok(false);
        };

        if !self.resolved_enabled(leaf) {
            let queue = self.nodes[leaf.as_usize()].queue;
            let drain = self.nodes[leaf.as_usize()].drain;
            let count = self.queues[queue.as_usize()].ready();
            let items = self.queues[queue.as_usize()].dequeue(count);
            self.queues[drain.as_usize()].enqueue(items);
            self.metrics.record_skipped(count as u64);
            self.log_info(leaf, &format!("segment disabled, {count} items passed through"));
            return Ok(true);
        }

        let size = self.resolved_batch_size(leaf);
        let queue = self.nodes[leaf.as_usize()].queue;
        let batch = self.queues[queue.as_usize()].dequeue(size);
        if batch.is_empty() {
            return Ok(false);
        }

        let count = batch.len();
        self.metrics.record_batch(count as u64);
        self.log_debug(leaf, &format!("processing batch of {count}"));

        let mut handler = match &mut self.nodes[leaf.as_usize()].kind {
            NodeKind::Process { handler } => match handler.take() {
                Some(handler) => handler,
                None => {
                    return Err(PipelineError::invariant(
                        "handler slot empty during dispatch",
                    ))
                }
            },
            NodeKind::Pipeline { .. } => {
                return Err(PipelineError::invariant("selected a container for dispatch"))
            }
        };

        let result = {
            let mut flow = crate::flow::Flow::new(self, leaf);
            handler(&mut flow, batch)
        };

        if let NodeKind::Process { handler: slot } = &mut self.nodes[leaf.as_usize()].kind {
            *slot = Some(handler);
        }

        if result.is_err() {
            self.metrics.record_handler_error();
        }
        result.map(|()| true)
    }

    /// Advance until at least `n` items are ready or no work remains
    ///
    /// Returns the number of ready items.
    ///
    /// # Errors
    ///
    /// Propagates the first handler error.
    pub fn prepare(&mut self, n: usize) -> Result<usize> {
        while self.has_pending() && self.ready() < n {
            if !self.process_batch()? {
                break;
            }
        }
        Ok(self.ready())
    }

    /// Run until nothing is pending anywhere in the pipeline
    ///
    /// # Errors
    ///
    /// Propagates the first handler error.
    pub fn flush(&mut self) -> Result<()> {
        while self.has_pending() {
            if !self.process_batch()? {
                break;
            }
        }
        Ok(())
    }

    /// Pull up to `n` ready items from the output
    ///
    /// Implicitly prepares `n` items first.
    ///
    /// # Errors
    ///
    /// Propagates the first handler error.
    pub fn dequeue(&mut self, n: usize) -> Result<Vec<T>> {
        self.prepare(n)?;
        Ok(self.queues[self.output.as_usize()].dequeue(n))
    }

    /// Whether no items will ever become ready without new input
    ///
    /// # Errors
    ///
    /// Propagates the first handler error.
    pub fn is_exhausted(&mut self) -> Result<bool> {
        Ok(self.prepare(1)? == 0)
    }
}
