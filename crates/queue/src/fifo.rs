//! Built-in `VecDeque`-backed FIFO

use std::collections::VecDeque;

use crate::Queue;

#[cfg(test)]
#[path = "fifo_test.rs"]
mod tests;

/// Unbounded FIFO on a `VecDeque`
///
/// The default queue implementation fabricated for every leaf segment and
/// for the pipeline's output.
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
}

impl<T> FifoQueue<T> {
    /// Create an empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Create an empty queue with pre-allocated capacity
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
        }
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> for FifoQueue<T> {
    fn enqueue(&mut self, items: Vec<T>) {
        self.items.extend(items);
    }

    fn requeue(&mut self, items: Vec<T>) {
        // Push in reverse so the first requeued item ends up at the head.
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    fn dequeue(&mut self, n: usize) -> Vec<T> {
        let take = n.min(self.items.len());
        self.items.drain(..take).collect()
    }

    fn ready(&self) -> usize {
        self.items.len()
    }
}
