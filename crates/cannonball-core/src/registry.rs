//! Anchor registry and reverse reference index
//!
//! Maps document-unique anchor names to node ids and tracks, for every node,
//! which other nodes point at it through a reference or a decision choice.
//! While a document is being read, references whose targets have not been
//! seen yet are buffered here until the whole input is available.

use crate::error::{ReferenceError, Result};
use crate::model::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Registry of anchors and inbound edges for one document
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    anchors: HashMap<String, NodeId>,
    /// target -> (referrer -> edge count)
    inbound: HashMap<NodeId, BTreeMap<NodeId, usize>>,
    pending: Vec<PendingReference>,
}

/// How a Decision names its selected Alternative
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceKey {
    /// Anchor of the Alternative, or its text
    Name(String),
    /// 1-based position among all Alternatives in document order
    Position(usize),
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceKey::Name(name) => f.write_str(name),
            ChoiceKey::Position(n) => write!(f, "#{n}"),
        }
    }
}

impl From<&str> for ChoiceKey {
    fn from(name: &str) -> Self {
        ChoiceKey::Name(name.to_string())
    }
}

/// Target of a buffered edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTarget {
    /// `[[#^anchor]]` dependency
    Anchor(String),
    /// `^alt(target)` selection
    Choice(ChoiceKey),
}

impl fmt::Display for PendingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingTarget::Anchor(anchor) => f.write_str(anchor),
            PendingTarget::Choice(key) => key.fmt(f),
        }
    }
}

/// Edge recorded before its target is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// Node that owns the edge
    pub source: NodeId,
    /// What it points at
    pub target: PendingTarget,
    /// Source line, for diagnostics
    pub line: usize,
}

impl ReferenceRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `anchor` to `node`
    ///
    /// # Errors
    /// [`ReferenceError::DuplicateAnchor`] if the anchor is taken.
    pub fn register(&mut self, anchor: &str, node: NodeId) -> Result<()> {
        if self.anchors.contains_key(anchor) {
            return Err(ReferenceError::DuplicateAnchor(anchor.to_string()).into());
        }
        self.anchors.insert(anchor.to_string(), node);
        Ok(())
    }

    /// Resolve an anchor to its node
    ///
    /// # Errors
    /// [`ReferenceError::UnknownAnchor`] if nothing is registered under it.
    pub fn resolve(&self, anchor: &str) -> Result<NodeId> {
        self.lookup(anchor)
            .ok_or_else(|| ReferenceError::UnknownAnchor(anchor.to_string()).into())
    }

    /// Non-failing lookup
    #[inline]
    #[must_use]
    pub fn lookup(&self, anchor: &str) -> Option<NodeId> {
        self.anchors.get(anchor).copied()
    }

    /// Whether the anchor is taken
    #[inline]
    #[must_use]
    pub fn contains(&self, anchor: &str) -> bool {
        self.anchors.contains_key(anchor)
    }

    /// Drop an anchor binding; returns the node it pointed at
    pub fn unregister(&mut self, anchor: &str) -> Option<NodeId> {
        self.anchors.remove(anchor)
    }

    /// Number of registered anchors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// No anchors registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Record an edge `source -> target` in the reverse index
    pub(crate) fn link(&mut self, source: NodeId, target: NodeId) {
        *self
            .inbound
            .entry(target)
            .or_default()
            .entry(source)
            .or_insert(0) += 1;
    }

    /// Remove one `source -> target` edge from the reverse index
    pub(crate) fn unlink(&mut self, source: NodeId, target: NodeId) {
        if let Some(sources) = self.inbound.get_mut(&target) {
            if let Some(count) = sources.get_mut(&source) {
                *count -= 1;
                if *count == 0 {
                    sources.remove(&source);
                }
            }
            if sources.is_empty() {
                self.inbound.remove(&target);
            }
        }
    }

    /// Forget every inbound entry of a removed node
    pub(crate) fn forget(&mut self, target: NodeId) {
        self.inbound.remove(&target);
    }

    /// Nodes with at least one edge into `target`, in id order
    pub fn referrers(&self, target: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inbound
            .get(&target)
            .into_iter()
            .flat_map(|sources| sources.keys().copied())
    }

    /// Buffer an edge whose target may not exist yet
    pub fn defer(&mut self, source: NodeId, target: PendingTarget, line: usize) {
        self.pending.push(PendingReference {
            source,
            target,
            line,
        });
    }

    /// Take all buffered edges in the order they were recorded
    pub fn take_pending(&mut self) -> Vec<PendingReference> {
        std::mem::take(&mut self.pending)
    }

    /// Number of buffered edges
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn register_and_resolve() {
        let mut reg = ReferenceRegistry::new();
        let id = NodeId::next();
        reg.register("q1", id).unwrap();
        assert_eq!(reg.resolve("q1").unwrap(), id);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_rejected() {
        let mut reg = ReferenceRegistry::new();
        reg.register("q1", NodeId::next()).unwrap();
        let err = reg.register("q1", NodeId::next()).unwrap_err();
        assert_eq!(
            err,
            GraphError::Reference(ReferenceError::DuplicateAnchor("q1".into()))
        );
    }

    #[test]
    fn unknown_anchor() {
        let reg = ReferenceRegistry::new();
        assert!(matches!(
            reg.resolve("nope"),
            Err(GraphError::Reference(ReferenceError::UnknownAnchor(_)))
        ));
    }

    #[test]
    fn reverse_index_counts_edges() {
        let mut reg = ReferenceRegistry::new();
        let (a, b) = (NodeId::next(), NodeId::next());
        reg.link(a, b);
        reg.link(a, b);
        reg.unlink(a, b);
        assert_eq!(reg.referrers(b).collect::<Vec<_>>(), vec![a]);
        reg.unlink(a, b);
        assert_eq!(reg.referrers(b).count(), 0);
    }

    #[test]
    fn pending_is_drained() {
        let mut reg = ReferenceRegistry::new();
        let src = NodeId::next();
        reg.defer(src, PendingTarget::Anchor("x".into()), 4);
        reg.defer(src, PendingTarget::Choice("SQL".into()), 4);
        reg.defer(src, PendingTarget::Choice(ChoiceKey::Position(2)), 5);
        assert_eq!(reg.pending_len(), 3);
        let pending = reg.take_pending();
        assert_eq!(pending[1].target.to_string(), "SQL");
        assert_eq!(pending[2].target.to_string(), "#2");
        assert_eq!(reg.pending_len(), 0);
    }

    #[test]
    fn choice_key_json_is_untagged() {
        let keys = vec![ChoiceKey::Name("SQL".into()), ChoiceKey::Position(3)];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["SQL",3]"#);
        let back: Vec<ChoiceKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
    }
}
