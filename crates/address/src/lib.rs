//! Piper - Address
//!
//! Slash-joined label paths: the identity of a segment inside a pipeline
//! tree, the context attached to every log line, and the query form used
//! when routing items to a named segment.
//!
//! # Design
//!
//! A [`Path`] is an immutable sequence of non-empty labels. Equality is
//! structural, so paths work as map keys; ordering is component-wise, so
//! ambiguous address matches can be broken deterministically.
//!
//! # Example
//!
//! ```
//! use piper_address::Path;
//!
//! let root = Path::new("main");
//! let leaf = root.child("half");
//!
//! assert_eq!(leaf.to_string(), "main/half");
//! assert_eq!(leaf.name(), Some("half"));
//! assert!(leaf.ends_with(&Path::new("half")));
//! ```

mod path;

#[cfg(test)]
#[path = "path_test.rs"]
mod tests;

pub use path::{Path, SEPARATOR};
