//! Segment descriptors
//!
//! The user-visible definition of a pipeline: a tree of named segments,
//! where a leaf wraps a handler function and a container composes children
//! in order. Descriptors are immutable once handed to `init`; the engine
//! consumes them to build its runtime instances.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::flow::Flow;

#[cfg(test)]
#[path = "descriptor_test.rs"]
mod tests;

/// Boxed handler function invoked once per batch
///
/// Receives the segment's flow-control handle and an ordered batch taken
/// from the segment's pending queue. Anything the handler wants to keep
/// flowing must be re-routed through one of the flow calls; items it
/// neither emits nor recycles are dropped.
pub type Handler<T, A = ()> = Box<dyn FnMut(&mut Flow<'_, T, A>, Vec<T>) -> Result<()>>;

/// Boxed admission predicate
///
/// Applied to items arriving at the segment through an enqueue path; items
/// it rejects skip the segment and continue on its drain.
pub type Allow<T> = Box<dyn Fn(&T) -> bool>;

static PROCESS_LABELS: AtomicUsize = AtomicUsize::new(0);
static PIPELINE_LABELS: AtomicUsize = AtomicUsize::new(0);

fn auto_label(kind: &str, counter: &AtomicUsize) -> String {
    format!("{kind}-{}", counter.fetch_add(1, Ordering::Relaxed) + 1)
}

/// What a segment is: a leaf with a handler or a container with children
pub enum SegmentKind<T, A = ()> {
    /// Leaf segment wrapping a user handler
    Process {
        /// The handler run once per batch
        handler: Handler<T, A>,
    },
    /// Container segment composing children in order
    Pipeline {
        /// Ordered child descriptors; never empty after validation
        children: Vec<Segment<T, A>>,
    },
}

/// Immutable segment definition
///
/// Built with [`Segment::process`] or [`Segment::pipeline`] and refined
/// with the `with_*` setters. An empty label is treated as absent and
/// replaced with a generated `process-N` / `pipeline-N` label.
///
/// # Example
///
/// ```
/// use piper_engine::Segment;
///
/// let segment: Segment<i64> = Segment::pipeline(
///     "main",
///     vec![
///         Segment::process("double", |flow, batch| {
///             flow.emit(batch.into_iter().map(|x| x * 2).collect());
///             Ok(())
///         })
///         .with_batch_size(2),
///     ],
/// );
/// assert_eq!(segment.label(), "main");
/// ```
pub struct Segment<T, A = ()> {
    pub(crate) label: String,
    pub(crate) kind: SegmentKind<T, A>,
    pub(crate) allow: Option<Allow<T>>,
    pub(crate) batch_size: Option<usize>,
    pub(crate) enabled: Option<bool>,
    pub(crate) debug: Option<u8>,
    pub(crate) verbose: Option<u8>,
    pub(crate) extra: BTreeMap<String, String>,
}

impl<T, A> Segment<T, A> {
    fn new(label: String, kind: SegmentKind<T, A>) -> Self {
        Self {
            label,
            kind,
            allow: None,
            batch_size: None,
            enabled: None,
            debug: None,
            verbose: None,
            extra: BTreeMap::new(),
        }
    }

    /// Define a leaf segment wrapping `handler`
    ///
    /// Pass an empty label to have one generated.
    pub fn process(
        label: impl Into<String>,
        handler: impl FnMut(&mut Flow<'_, T, A>, Vec<T>) -> Result<()> + 'static,
    ) -> Self {
        let mut label = label.into();
        if label.is_empty() {
            label = auto_label("process", &PROCESS_LABELS);
        }
        Self::new(
            label,
            SegmentKind::Process {
                handler: Box::new(handler),
            },
        )
    }

    /// Define a container segment composing `children` in order
    ///
    /// Pass an empty label to have one generated.
    pub fn pipeline(label: impl Into<String>, children: Vec<Segment<T, A>>) -> Self {
        let mut label = label.into();
        if label.is_empty() {
            label = auto_label("pipeline", &PIPELINE_LABELS);
        }
        Self::new(label, SegmentKind::Pipeline { children })
    }

    /// Set the admission predicate
    #[must_use]
    pub fn with_allow(mut self, allow: impl Fn(&T) -> bool + 'static) -> Self {
        self.allow = Some(Box::new(allow));
        self
    }

    /// Set the batch size; must be positive
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set whether the segment starts enabled
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the debug level
    #[must_use]
    pub fn with_debug(mut self, debug: u8) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set the verbose level
    #[must_use]
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Attach a free-form key/value pair
    ///
    /// Unknown construction options end up here; the engine carries them
    /// but never interprets them.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The segment's label
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this is a leaf segment
    #[inline]
    pub fn is_process(&self) -> bool {
        matches!(self.kind, SegmentKind::Process { .. })
    }

    /// Child descriptors; empty for a leaf
    pub fn children(&self) -> &[Segment<T, A>] {
        match &self.kind {
            SegmentKind::Pipeline { children } => children,
            SegmentKind::Process { .. } => &[],
        }
    }

    /// The declared batch size, if any
    #[inline]
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// The declared enabled flag, if any
    #[inline]
    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    /// The free-form extras map
    #[inline]
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }
}

impl<T, A> fmt::Debug for Segment<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("label", &self.label)
            .field("process", &self.is_process())
            .field("children", &self.children().len())
            .field("batch_size", &self.batch_size)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
