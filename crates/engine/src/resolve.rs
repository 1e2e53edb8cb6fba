//! Address resolution
//!
//! Addresses are bare labels (`b`) or slash-joined paths (`subpipe/b`,
//! `main/subpipe/c`). Resolution starts at the caller's enclosing
//! container and ascends toward the root, skipping each already-searched
//! subtree on the way up, so the nearest match wins over a same-named
//! segment further away. Successful lookups are memoized per
//! `(caller, query)` for the lifetime of the pipeline; the tree is frozen
//! after `init`, so cached hits never go stale.

use piper_address::Path;

use crate::instance::{NodeKind, Pipeline, SegmentId};

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;

impl<T, A> Pipeline<T, A> {
    /// Resolve an address from the root's point of view
    #[must_use]
    pub fn find_segment(&mut self, address: &str) -> Option<SegmentId> {
        let root = self.root;
        self.find_segment_from(root, address)
    }

    /// Resolve an address as seen from `caller`
    ///
    /// The same query from the same caller always returns the same
    /// segment within one pipeline lifetime.
    #[must_use]
    pub fn find_segment_from(&mut self, caller: SegmentId, address: &str) -> Option<SegmentId> {
        let key = (caller, address.to_owned());
        if let Some(&hit) = self.cache.get(&key) {
            return Some(hit);
        }

        let path = Path::new(address);
        if path.is_empty() {
            return None;
        }

        let found = self.resolve(caller, &path);
        if let Some(id) = found {
            self.cache.insert(key, id);
        }
        found
    }

    fn resolve(&self, caller: SegmentId, path: &Path) -> Option<SegmentId> {
        let node = &self.nodes[caller.as_usize()];

        // A parentless leaf can only mean itself.
        if node.parent.is_none() {
            if let NodeKind::Process { .. } = node.kind {
                let matches = path.len() == 1 && path.name() == Some(node.label.as_str());
                return matches.then_some(caller);
            }
        }

        let mut anchor = match &node.kind {
            NodeKind::Pipeline { .. } => caller,
            NodeKind::Process { .. } => node.parent?,
        };
        let mut referrer: Option<SegmentId> = None;

        loop {
            if let Some(found) = self.descendant(anchor, path.split(), referrer) {
                return Some(found);
            }
            match self.nodes[anchor.as_usize()].parent {
                Some(parent) => {
                    referrer = Some(anchor);
                    anchor = parent;
                }
                None => return None,
            }
        }
    }

    /// Search the subtree under `node` for `labels`
    ///
    /// Tries, in order: greedy literal descent through the child
    /// directories; a recursive search of container children (skipping
    /// `referrer`), breaking ambiguity toward the lexicographically
    /// smallest full path; and re-anchoring at `node` itself when the
    /// query begins with the node's own label.
    fn descendant(
        &self,
        node: SegmentId,
        labels: &[String],
        referrer: Option<SegmentId>,
    ) -> Option<SegmentId> {
        debug_assert!(!labels.is_empty());

        // Greedy literal prefix through the directory chain.
        let mut cursor = node;
        let mut consumed = 0;
        while consumed < labels.len() {
            let next = match &self.nodes[cursor.as_usize()].kind {
                NodeKind::Pipeline { directory, .. } => directory.get(&labels[consumed]).copied(),
                NodeKind::Process { .. } => None,
            };
            match next {
                Some(child) => {
                    cursor = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        if consumed == labels.len() {
            return Some(cursor);
        }

        // Recurse into container children, nearest match by path order.
        if let NodeKind::Pipeline { children, .. } = &self.nodes[node.as_usize()].kind {
            let matches: Vec<SegmentId> = children
                .iter()
                .filter(|&&child| Some(child) != referrer)
                .filter(|&&child| {
                    matches!(self.nodes[child.as_usize()].kind, NodeKind::Pipeline { .. })
                })
                .filter_map(|&child| self.descendant(child, labels, None))
                .collect();
            if !matches.is_empty() {
                return matches.into_iter().min_by(|a, b| {
                    self.nodes[a.as_usize()]
                        .path
                        .split()
                        .cmp(self.nodes[b.as_usize()].path.split())
                });
            }
        }

        // The query may start with this node's own label.
        if self.nodes[node.as_usize()].label == labels[0] {
            if labels.len() == 1 {
                return Some(node);
            }
            return self.descendant(node, &labels[1..], Some(node));
        }

        None
    }
}
