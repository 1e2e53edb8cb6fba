//! Engine error types
//!
//! Construction errors surface at `init`, routing errors at the flow-control
//! calls, handler errors wherever scheduling is driven from. The scheduler
//! never catches anything itself; the pipeline is not self-healing.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by pipeline construction, routing, and handlers
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Segment label failed validation at build time
    #[error("invalid segment label '{label}': {reason}")]
    InvalidLabel {
        /// The offending label
        label: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Two children of the same container share a label
    #[error("duplicate label '{label}' among children of '{parent}'")]
    DuplicateLabel {
        /// The shared label
        label: String,
        /// The container holding both children
        parent: String,
    },

    /// A container segment was declared with no children
    #[error("pipeline segment '{label}' has no children")]
    EmptyPipeline {
        /// Label of the empty container
        label: String,
    },

    /// A segment declared a batch size of zero
    #[error("segment '{label}' has a zero batch size")]
    InvalidBatchSize {
        /// Label of the offending segment
        label: String,
    },

    /// An address did not resolve to any segment
    #[error("no segment found for address '{address}'")]
    Unroutable {
        /// The unresolvable address
        address: String,
    },

    /// A user handler failed
    #[error("handler failed in segment '{segment}': {message}")]
    Handler {
        /// Path of the segment whose handler failed
        segment: String,
        /// Handler-provided message
        message: String,
    },

    /// Internal invariant violation; should be impossible
    #[error("engine invariant violated: {0}")]
    Invariant(String),
}

impl PipelineError {
    /// Create an InvalidLabel error
    #[inline]
    pub fn invalid_label(label: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason,
        }
    }

    /// Create a DuplicateLabel error
    #[inline]
    pub fn duplicate_label(label: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::DuplicateLabel {
            label: label.into(),
            parent: parent.into(),
        }
    }

    /// Create an EmptyPipeline error
    #[inline]
    pub fn empty_pipeline(label: impl Into<String>) -> Self {
        Self::EmptyPipeline {
            label: label.into(),
        }
    }

    /// Create an InvalidBatchSize error
    #[inline]
    pub fn invalid_batch_size(label: impl Into<String>) -> Self {
        Self::InvalidBatchSize {
            label: label.into(),
        }
    }

    /// Create an Unroutable error
    #[inline]
    pub fn unroutable(address: impl Into<String>) -> Self {
        Self::Unroutable {
            address: address.into(),
        }
    }

    /// Create a Handler error
    #[inline]
    pub fn handler(segment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            segment: segment.into(),
            message: message.into(),
        }
    }

    /// Create an Invariant error
    #[inline]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}
