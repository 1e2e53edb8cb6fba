//! Runtime pipeline instances
//!
//! `init` turns a descriptor tree into an arena of nodes: every leaf owns a
//! pending queue, every container aliases its first child's queue, and each
//! node's drain is the next adjacent segment's pending queue - or, at the
//! root, the output queue the caller dequeues from. Parent links are plain
//! indices, so the tree can hold back-references without ownership cycles.
//!
//! # Queue topology
//!
//! ```text
//!            main
//!   [q0] s1 ──▶ [q1] s2 ──▶ [q2] s3 ──▶ [out]
//!    ▲                                    │
//!  enqueue                             dequeue
//! ```
//!
//! `enqueue` at a container lands in its leftmost leaf (transitively);
//! items in the output queue are the result side of the whole pipeline.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use piper_address::{Path, SEPARATOR};
use piper_queue::{FifoQueue, Queue};

use crate::descriptor::{Allow, Handler, Segment, SegmentKind};
use crate::error::{PipelineError, Result};
use crate::logger::{Logger, TracingLogger};
use crate::metrics::EngineMetrics;

#[cfg(test)]
#[path = "instance_test.rs"]
mod tests;

/// Identifier of a segment instance inside one pipeline
///
/// Indexes into the pipeline's node arena. Ids are only meaningful for the
/// pipeline that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(u32);

impl SegmentId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Numeric index of this segment
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment:{}", self.0)
    }
}

/// Identifier of a queue inside one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct QueueId(u32);

impl QueueId {
    /// Stand-in until drain wiring runs; never survives `init`
    pub(crate) const PLACEHOLDER: QueueId = QueueId(u32::MAX);

    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Per-instance settings that shadow the descriptor and the parent chain
///
/// `None` means "not overridden": resolution falls through to the
/// descriptor value, then the parent's resolved value, then the global
/// default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Batch size override
    pub batch_size: Option<usize>,
    /// Enablement override
    pub enabled: Option<bool>,
    /// Debug level override
    pub debug: Option<u8>,
    /// Verbose level override
    pub verbose: Option<u8>,
}

/// Global fallbacks for the configuration inheritance chain
#[derive(Debug, Clone)]
pub struct EngineDefaults {
    /// Fallback batch size
    pub batch_size: usize,
    /// Fallback enablement
    pub enabled: bool,
    /// Fallback debug level
    pub debug: u8,
    /// Fallback verbose level
    pub verbose: u8,
    /// Process-wide debug override; set from `PIPER_DEBUG` unless given
    /// explicitly
    pub debug_override: Option<u8>,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            batch_size: piper_config::DEFAULT_BATCH_SIZE,
            enabled: true,
            debug: 0,
            verbose: 0,
            debug_override: None,
        }
    }
}

impl EngineDefaults {
    /// Build defaults from a loaded configuration, applying the
    /// environment debug override
    #[must_use]
    pub fn from_config(config: &piper_config::Config) -> Self {
        Self {
            batch_size: config.global.batch_size,
            enabled: true,
            debug: config.global.debug,
            verbose: config.global.verbose,
            debug_override: piper_config::debug_override(),
        }
    }
}

/// Factory fabricating one FIFO per leaf segment plus the output queue
pub type QueueFactory<T> = Box<dyn Fn() -> Box<dyn Queue<T>>>;

pub(crate) enum NodeKind<T, A> {
    Process {
        // Taken out of the slot for the duration of a handler invocation.
        handler: Option<Handler<T, A>>,
    },
    Pipeline {
        children: Vec<SegmentId>,
        directory: HashMap<String, SegmentId>,
    },
}

pub(crate) struct Node<T, A> {
    pub(crate) label: String,
    pub(crate) path: Path,
    pub(crate) parent: Option<SegmentId>,
    pub(crate) kind: NodeKind<T, A>,
    pub(crate) queue: QueueId,
    pub(crate) drain: QueueId,
    pub(crate) allow: Option<Allow<T>>,
    pub(crate) batch_size: Option<usize>,
    pub(crate) enabled: Option<bool>,
    pub(crate) debug: Option<u8>,
    pub(crate) verbose: Option<u8>,
    pub(crate) extra: BTreeMap<String, String>,
    pub(crate) overrides: Overrides,
}

/// A runnable pipeline instance
///
/// Produced by [`Pipeline::init`] or [`PipelineBuilder::build`]. The
/// external contract is single-producer / single-consumer: feed items with
/// [`enqueue`](Pipeline::enqueue), drive work with
/// [`prepare`](Pipeline::prepare) / [`flush`](Pipeline::flush), and drain
/// results with [`dequeue`](Pipeline::dequeue).
pub struct Pipeline<T, A = ()> {
    pub(crate) nodes: Vec<Node<T, A>>,
    pub(crate) queues: Vec<Box<dyn Queue<T>>>,
    pub(crate) root: SegmentId,
    pub(crate) output: QueueId,
    pub(crate) args: A,
    pub(crate) defaults: EngineDefaults,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) cache: HashMap<(SegmentId, String), SegmentId>,
    pub(crate) metrics: EngineMetrics,
}

/// Builder for pipeline instances
///
/// Lets embedders swap the logger, the queue implementation, and the
/// global defaults before `build` assembles the instance tree.
pub struct PipelineBuilder<T> {
    defaults: EngineDefaults,
    logger: Arc<dyn Logger>,
    queue_factory: QueueFactory<T>,
}

impl<T: 'static> PipelineBuilder<T> {
    /// Create a builder with the built-in logger and FIFO
    #[must_use]
    pub fn new() -> Self {
        Self {
            defaults: EngineDefaults::default(),
            logger: Arc::new(TracingLogger),
            queue_factory: Box::new(|| Box::new(FifoQueue::new())),
        }
    }

    /// Replace the global defaults
    #[must_use]
    pub fn defaults(mut self, defaults: EngineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the logger implementation
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the queue implementation
    #[must_use]
    pub fn queue_factory(mut self, factory: impl Fn() -> Box<dyn Queue<T>> + 'static) -> Self {
        self.queue_factory = Box::new(factory);
        self
    }

    /// Assemble the instance tree from a descriptor
    ///
    /// Children are constructed bottom-up, parent links are set top-down
    /// afterwards, and the drain of every node is wired to the next
    /// adjacent segment's pending queue (the output queue at the root).
    /// The `args` value is recorded on the root and handed to every
    /// handler invocation through the flow handle.
    ///
    /// # Errors
    ///
    /// Rejects empty containers, labels containing `/`, sibling label
    /// collisions, and zero batch sizes.
    pub fn build<A>(self, segment: Segment<T, A>, args: A) -> Result<Pipeline<T, A>> {
        let mut defaults = self.defaults;
        defaults.debug_override = defaults.debug_override.or_else(piper_config::debug_override);

        let mut nodes: Vec<Node<T, A>> = Vec::new();
        let mut queues: Vec<Box<dyn Queue<T>>> = Vec::new();
        let root = build_tree(segment, None, &mut nodes, &mut queues, &self.queue_factory)?;

        // Parent back-links, top-down.
        let mut links = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            if let NodeKind::Pipeline { children, .. } = &node.kind {
                for &child in children {
                    links.push((child, SegmentId::new(index as u32)));
                }
            }
        }
        for (child, parent) in links {
            nodes[child.as_usize()].parent = Some(parent);
        }

        // Output queue, then drains parents-before-children so a last
        // child can inherit its container's already-wired drain.
        let output = QueueId::new(queues.len() as u32);
        queues.push((self.queue_factory)());
        nodes[root.as_usize()].drain = output;

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let assignments: Vec<(SegmentId, QueueId)> = match &nodes[id.as_usize()].kind {
                NodeKind::Process { .. } => continue,
                NodeKind::Pipeline { children, .. } => {
                    let drain = nodes[id.as_usize()].drain;
                    children
                        .iter()
                        .enumerate()
                        .map(|(i, &child)| {
                            let next = match children.get(i + 1) {
                                Some(&sibling) => nodes[sibling.as_usize()].queue,
                                None => drain,
                            };
                            (child, next)
                        })
                        .collect()
                }
            };
            for (child, drain) in assignments {
                nodes[child.as_usize()].drain = drain;
                stack.push(child);
            }
        }

        Ok(Pipeline {
            nodes,
            queues,
            root,
            output,
            args,
            defaults,
            logger: self.logger,
            cache: HashMap::new(),
            metrics: EngineMetrics::new(),
        })
    }
}

impl<T: 'static> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn build_tree<T, A>(
    segment: Segment<T, A>,
    parent_path: Option<&Path>,
    nodes: &mut Vec<Node<T, A>>,
    queues: &mut Vec<Box<dyn Queue<T>>>,
    factory: &QueueFactory<T>,
) -> Result<SegmentId> {
    let Segment {
        label,
        kind,
        allow,
        batch_size,
        enabled,
        debug,
        verbose,
        extra,
    } = segment;

    if label.is_empty() {
        return Err(PipelineError::invalid_label(label, "must not be empty"));
    }
    if label.contains(SEPARATOR) {
        return Err(PipelineError::invalid_label(label, "must not contain '/'"));
    }
    if batch_size == Some(0) {
        return Err(PipelineError::invalid_batch_size(label));
    }

    let path = match parent_path {
        Some(parent) => parent.child(&label),
        None => Path::new(&label),
    };

    let (node_kind, queue) = match kind {
        SegmentKind::Process { handler } => {
            let queue = QueueId::new(queues.len() as u32);
            queues.push(factory());
            (
                NodeKind::Process {
                    handler: Some(handler),
                },
                queue,
            )
        }
        SegmentKind::Pipeline { children } => {
            if children.is_empty() {
                return Err(PipelineError::empty_pipeline(label));
            }
            let mut child_ids = Vec::with_capacity(children.len());
            for child in children {
                child_ids.push(build_tree(child, Some(&path), nodes, queues, factory)?);
            }
            let mut directory = HashMap::with_capacity(child_ids.len());
            for &child in &child_ids {
                let child_label = nodes[child.as_usize()].label.clone();
                if directory.insert(child_label.clone(), child).is_some() {
                    return Err(PipelineError::duplicate_label(child_label, label));
                }
            }
            // A container never owns a pending queue; it aliases its
            // first child's.
            let queue = nodes[child_ids[0].as_usize()].queue;
            (
                NodeKind::Pipeline {
                    children: child_ids,
                    directory,
                },
                queue,
            )
        }
    };

    let id = SegmentId::new(nodes.len() as u32);
    nodes.push(Node {
        label,
        path,
        parent: None,
        kind: node_kind,
        queue,
        drain: QueueId::PLACEHOLDER,
        allow,
        batch_size,
        enabled,
        debug,
        verbose,
        extra,
        overrides: Overrides::default(),
    });
    Ok(id)
}

impl<T: 'static, A> Pipeline<T, A> {
    /// Build a runnable instance with default logger, queue, and settings
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::build`].
    pub fn init(segment: Segment<T, A>, args: A) -> Result<Self> {
        PipelineBuilder::new().build(segment, args)
    }

    /// Start a builder to customize logger, queues, or defaults
    #[must_use]
    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder::new()
    }
}

impl<T, A> Pipeline<T, A> {
    /// Feed items into the pipeline
    ///
    /// Items pass the root's gating (enablement, allow predicate) and land
    /// in the leftmost leaf's pending queue. Nothing runs until the
    /// pipeline is driven with [`prepare`](Pipeline::prepare),
    /// [`flush`](Pipeline::flush), or [`dequeue`](Pipeline::dequeue).
    pub fn enqueue(&mut self, items: Vec<T>) {
        self.metrics.record_enqueued(items.len() as u64);
        let root = self.root;
        self.enqueue_at(root, items);
    }

    /// Enqueue at an arbitrary segment, honoring its gating
    ///
    /// Disabled segments pass every item straight to their drain; an allow
    /// predicate partitions arrivals between the pending queue and the
    /// drain. Container enqueues delegate to the first child, re-applying
    /// that child's own gating.
    pub(crate) fn enqueue_at(&mut self, id: SegmentId, items: Vec<T>) {
        if items.is_empty() {
            return;
        }

        if !self.resolved_enabled(id) {
            let count = items.len();
            let drain = self.nodes[id.as_usize()].drain;
            self.queues[drain.as_usize()].enqueue(items);
            self.metrics.record_skipped(count as u64);
            self.log_info(id, &format!("segment disabled, {count} items passed through"));
            return;
        }

        let (accepted, rejected): (Vec<T>, Vec<T>) = match &self.nodes[id.as_usize()].allow {
            Some(allow) => items.into_iter().partition(|item| allow(item)),
            None => (items, Vec::new()),
        };

        if !rejected.is_empty() {
            let count = rejected.len();
            let drain = self.nodes[id.as_usize()].drain;
            self.queues[drain.as_usize()].enqueue(rejected);
            self.metrics.record_skipped(count as u64);
            self.log_info(id, &format!("{count} items rejected by allow, sent to drain"));
        }

        if accepted.is_empty() {
            return;
        }
        let head_child = match &self.nodes[id.as_usize()].kind {
            NodeKind::Pipeline { children, .. } => Some(children[0]),
            NodeKind::Process { .. } => None,
        };
        match head_child {
            Some(child) => self.enqueue_at(child, accepted),
            None => {
                let queue = self.nodes[id.as_usize()].queue;
                self.queues[queue.as_usize()].enqueue(accepted);
            }
        }
    }

    /// Items queued but not yet processed anywhere in the pipeline
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_at(self.root)
    }

    /// Items queued under one segment (sum over its leaf descendants)
    #[must_use]
    pub fn pending_at(&self, id: SegmentId) -> usize {
        match &self.nodes[id.as_usize()].kind {
            NodeKind::Process { .. } => {
                self.queues[self.nodes[id.as_usize()].queue.as_usize()].ready()
            }
            NodeKind::Pipeline { children, .. } => {
                children.iter().map(|&child| self.pending_at(child)).sum()
            }
        }
    }

    /// Whether any items are still pending
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Items that have reached the output and await dequeue
    #[must_use]
    pub fn ready(&self) -> usize {
        self.queues[self.output.as_usize()].ready()
    }

    /// The root segment
    #[inline]
    #[must_use]
    pub fn root(&self) -> SegmentId {
        self.root
    }

    /// Iterate over all segment ids in construction order
    pub fn segments(&self) -> impl Iterator<Item = SegmentId> {
        (0..self.nodes.len() as u32).map(SegmentId::new)
    }

    /// Number of segments in the tree
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.nodes.len()
    }

    /// Full path of a segment
    #[must_use]
    pub fn path(&self, id: SegmentId) -> &Path {
        &self.nodes[id.as_usize()].path
    }

    /// Label of a segment
    #[must_use]
    pub fn label(&self, id: SegmentId) -> &str {
        &self.nodes[id.as_usize()].label
    }

    /// Whether a segment is a leaf
    #[must_use]
    pub fn is_process(&self, id: SegmentId) -> bool {
        matches!(self.nodes[id.as_usize()].kind, NodeKind::Process { .. })
    }

    /// Parent of a segment; None at the root
    #[must_use]
    pub fn parent(&self, id: SegmentId) -> Option<SegmentId> {
        self.nodes[id.as_usize()].parent
    }

    /// Children of a segment; empty for a leaf
    #[must_use]
    pub fn children(&self, id: SegmentId) -> &[SegmentId] {
        match &self.nodes[id.as_usize()].kind {
            NodeKind::Pipeline { children, .. } => children,
            NodeKind::Process { .. } => &[],
        }
    }

    /// Free-form extras recorded on the segment's descriptor
    #[must_use]
    pub fn extra(&self, id: SegmentId) -> &BTreeMap<String, String> {
        &self.nodes[id.as_usize()].extra
    }

    /// The init arguments recorded on the root
    #[inline]
    #[must_use]
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Engine counters for this instance
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Current per-instance overrides of a segment
    #[must_use]
    pub fn overrides(&self, id: SegmentId) -> Overrides {
        self.nodes[id.as_usize()].overrides
    }

    /// Override the batch size; None clears back to inherited
    pub fn set_batch_size(&mut self, id: SegmentId, batch_size: Option<usize>) {
        self.nodes[id.as_usize()].overrides.batch_size = batch_size;
    }

    /// Override enablement; None clears back to inherited
    pub fn set_enabled(&mut self, id: SegmentId, enabled: Option<bool>) {
        self.nodes[id.as_usize()].overrides.enabled = enabled;
    }

    /// Override the debug level; None clears back to inherited
    pub fn set_debug(&mut self, id: SegmentId, debug: Option<u8>) {
        self.nodes[id.as_usize()].overrides.debug = debug;
    }

    /// Override the verbose level; None clears back to inherited
    pub fn set_verbose(&mut self, id: SegmentId, verbose: Option<u8>) {
        self.nodes[id.as_usize()].overrides.verbose = verbose;
    }

    /// Resolved batch size: override, descriptor, ancestors, default
    ///
    /// Never returns zero.
    #[must_use]
    pub fn resolved_batch_size(&self, id: SegmentId) -> usize {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.as_usize()];
            if let Some(value) = node.overrides.batch_size {
                return value.max(1);
            }
            if let Some(value) = node.batch_size {
                return value.max(1);
            }
            cursor = node.parent;
        }
        self.defaults.batch_size.max(1)
    }

    /// Resolved enablement: override, descriptor, ancestors, default
    #[must_use]
    pub fn resolved_enabled(&self, id: SegmentId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.as_usize()];
            if let Some(value) = node.overrides.enabled {
                return value;
            }
            if let Some(value) = node.enabled {
                return value;
            }
            cursor = node.parent;
        }
        self.defaults.enabled
    }

    /// Resolved debug level; the process-wide override wins outright
    #[must_use]
    pub fn resolved_debug(&self, id: SegmentId) -> u8 {
        if let Some(level) = self.defaults.debug_override {
            return level;
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.as_usize()];
            if let Some(value) = node.overrides.debug {
                return value;
            }
            if let Some(value) = node.debug {
                return value;
            }
            cursor = node.parent;
        }
        self.defaults.debug
    }

    /// Resolved verbose level: override, descriptor, ancestors, default
    #[must_use]
    pub fn resolved_verbose(&self, id: SegmentId) -> u8 {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.as_usize()];
            if let Some(value) = node.overrides.verbose {
                return value;
            }
            if let Some(value) = node.verbose {
                return value;
            }
            cursor = node.parent;
        }
        self.defaults.verbose
    }

    pub(crate) fn log_info(&self, id: SegmentId, message: &str) {
        if self.resolved_debug(id) > 0 || self.resolved_verbose(id) > 0 {
            self.logger.info(self.path(id), message);
        }
    }

    pub(crate) fn log_debug(&self, id: SegmentId, message: &str) {
        if self.resolved_debug(id) > 0 {
            self.logger.debug(self.path(id), message);
        }
    }

    pub(crate) fn log_warn(&self, id: SegmentId, message: &str) {
        self.logger.warn(self.path(id), message);
    }

    pub(crate) fn log_error(&self, id: SegmentId, message: &str) {
        self.logger.error(self.path(id), message);
    }
}

impl<T, A> fmt::Debug for Pipeline<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.nodes[self.root.as_usize()].path.to_string())
            .field("segments", &self.nodes.len())
            .field("pending", &self.pending())
            .field("ready", &self.ready())
            .finish()
    }
}

impl<T, A> fmt::Display for Pipeline<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes[self.root.as_usize()].path)
    }
}
