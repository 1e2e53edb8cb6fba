//! Piper - Engine
//!
//! In-process data-flow pipeline engine. A pipeline is a tree of named
//! segments: leaves wrap user handler functions that transform batches of
//! items, containers compose children in order. Once initialized, the tree
//! becomes a runnable instance that accepts items at the root, drives them
//! through staged handlers in configurable batch sizes, and produces
//! results for the caller to drain.
//!
//! # Architecture
//!
//! ```text
//! [Caller]                      [Instance tree]                  [Caller]
//!  enqueue ──▶ ┌─────────────────────────────────────────┐ ──▶ dequeue
//!              │ main                                    │
//!              │   subpipe            process-c          │
//!              │     [q] a ──▶ [q] b ──▶ [q] c ──▶ [out] │
//!              └─────────────────────────────────────────┘
//! ```
//!
//! Each leaf owns a pending queue; its drain is the next adjacent
//! segment's pending queue, or the output queue at the end of the tree.
//! The scheduler advances whichever leaf is under the most pressure
//! (backlog relative to batch size), preferring leaves with a full batch
//! closest to the output. Handlers re-route their items through the
//! [`Flow`] handle: onward with `emit`, out of the enclosing container
//! with `eject`, back to its head with `inject`, head-of-line with
//! `recycle`, or to any named segment with `inject_at` / `inject_after`.
//!
//! # Key Design
//!
//! - **Single-threaded**: exactly one handler runs at a time; every call
//!   completes synchronously, and the instance expects one producer and
//!   one consumer at the root boundary
//! - **Arena instances**: nodes are indexed by [`SegmentId`], parents are
//!   stored as indices, so the tree carries back-references without
//!   ownership cycles
//! - **Inherited configuration**: batch size, enablement, and log levels
//!   resolve per read through override, descriptor, ancestors, then the
//!   global defaults
//! - **Swappable edges**: queues and the logger are consumed behind small
//!   traits and replaced through [`PipelineBuilder`]
//!
//! # Example
//!
//! ```
//! use piper_engine::{Pipeline, Segment};
//!
//! let segment = Segment::pipeline(
//!     "main",
//!     vec![Segment::process("double", |flow, batch: Vec<i64>| {
//!         flow.emit(batch.into_iter().map(|x| x * 2).collect());
//!         Ok(())
//!     })
//!     .with_batch_size(2)],
//! );
//!
//! let mut pipeline = Pipeline::init(segment, ()).unwrap();
//! pipeline.enqueue(vec![1, 2, 3]);
//! pipeline.flush().unwrap();
//! assert_eq!(pipeline.dequeue(3).unwrap(), vec![2, 4, 6]);
//! ```

mod descriptor;
mod error;
mod flow;
mod instance;
mod logger;
mod metrics;
mod resolve;
mod scheduler;

pub use descriptor::{Allow, Handler, Segment, SegmentKind};
pub use error::{PipelineError, Result};
pub use flow::Flow;
pub use instance::{
    EngineDefaults, Overrides, Pipeline, PipelineBuilder, QueueFactory, SegmentId,
};
pub use logger::{LogRecord, Logger, MemoryLogger, TracingLogger};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use scheduler::FULL_BATCH;

// Re-export key types from dependencies for convenience
pub use piper_address::Path;
pub use piper_queue::{FifoQueue, Queue};
