//! Piper - Queue
//!
//! The small FIFO interface the engine pushes items through, plus the
//! built-in `VecDeque`-backed implementation.
//!
//! # Design
//!
//! The engine never assumes anything about item storage beyond these four
//! operations. Any FIFO that satisfies [`Queue`] can be swapped in via the
//! engine's queue factory, the same way a custom logger can replace the
//! built-in one.
//!
//! - **Unbounded**: no capacity limit, no blocking
//! - **Order-preserving**: `requeue` prepends while keeping the relative
//!   order of the requeued items
//! - **Infallible**: operations cannot fail; an implementation that can
//!   should treat failure as an internal invariant violation
//!
//! # Example
//!
//! ```
//! use piper_queue::{FifoQueue, Queue};
//!
//! let mut queue = FifoQueue::new();
//! queue.enqueue(vec![2, 3]);
//! queue.requeue(vec![0, 1]);
//!
//! assert_eq!(queue.ready(), 4);
//! assert_eq!(queue.dequeue(3), vec![0, 1, 2]);
//! ```

mod fifo;

pub use fifo::FifoQueue;

/// FIFO container of in-flight items
///
/// Each leaf segment owns one pending queue and the pipeline root owns one
/// output queue, all behind this interface.
pub trait Queue<T> {
    /// Append items to the tail of the queue
    fn enqueue(&mut self, items: Vec<T>);

    /// Prepend items to the head of the queue, preserving their order
    ///
    /// `requeue(vec![a, b])` followed by `dequeue(1)` yields `a`.
    fn requeue(&mut self, items: Vec<T>);

    /// Remove up to `n` items from the head and return them in order
    fn dequeue(&mut self, n: usize) -> Vec<T>;

    /// Number of items currently queued
    fn ready(&self) -> usize;

    /// Whether the queue holds no items
    fn is_empty(&self) -> bool {
        self.ready() == 0
    }
}
