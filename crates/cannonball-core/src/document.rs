//! Arena-backed outline document
//!
//! All nodes of a document live in one flat table keyed by [`NodeId`].
//! Parent/child links and reference edges are stored as ids, so the tree
//! never owns itself through pointers. A synthetic root (never serialized,
//! never removed) holds the top-level entries.
//!
//! Every mutation validates first and writes second: an `Err` means the
//! document is exactly as it was before the call. Successful mutations mark
//! the affected nodes dirty through the [`PropagationEngine`].

use crate::error::{GraphError, ReferenceError, Result, StructuralError};
use crate::model::{
    validate_anchor, DecisionState, Family, Node, NodeId, QuestionState, Status, Variant,
};
use crate::propagation::PropagationEngine;
use crate::registry::{ChoiceKey, PendingTarget, ReferenceRegistry};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};

/// An outline document
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: IndexMap<NodeId, Node>,
    root: NodeId,
    registry: ReferenceRegistry,
    /// Dirty nodes not yet recomputed
    pub(crate) pending: BTreeSet<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        let root = Node::bare(Variant::Bullet, "");
        let root_id = root.id();
        let mut nodes = IndexMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            registry: ReferenceRegistry::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Id of the synthetic root
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, not counting the root
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Document has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` belongs to this document
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node by id, if present
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Node by id
    ///
    /// # Errors
    /// `NodeNotFound` if absent.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| GraphError::not_found(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or_else(|| GraphError::not_found(id))
    }

    /// Node by anchor
    ///
    /// # Errors
    /// `UnknownAnchor` if no node carries it.
    pub fn by_anchor(&self, anchor: &str) -> Result<&Node> {
        let id = self.registry.resolve(anchor)?;
        self.node(id)
    }

    /// Anchor registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Ordered children of `id`
    ///
    /// # Errors
    /// `NodeNotFound` if absent.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    /// Ancestors of `id`, nearest first, ending at the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(Node::parent), move |p| {
            self.get(*p).and_then(Node::parent)
        })
    }

    /// Nesting depth: 0 for the root, 1 for top-level entries
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Whether `ancestor` lies strictly above `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Pre-order walk of all entries in document order
    ///
    /// The iterator is lazy, finite, and can be restarted by cloning it
    /// before consumption or by calling this method again.
    #[must_use]
    pub fn traverse(&self) -> Traversal<'_> {
        let stack = self.nodes[&self.root].children.iter().rev().copied().collect();
        Traversal { doc: self, stack }
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`
    #[must_use]
    pub fn traverse_from(&self, id: NodeId) -> Traversal<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        Traversal { doc: self, stack }
    }

    /// Resolved targets of the node's references
    pub fn reference_targets(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|n| n.references().iter())
            .filter_map(|a| self.registry.lookup(a))
    }

    /// Outgoing dependency edges: children, references and the choice
    pub(crate) fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut deps = node.children.clone();
        deps.extend(self.reference_targets(id));
        deps.extend(node.choice);
        deps
    }

    /// Whether `to` is reachable from `from` over tree, reference and
    /// choice edges
    #[must_use]
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.dependencies(id));
            }
        }
        false
    }

    fn ensure_acyclic(&self, from: NodeId, to: NodeId) -> Result<()> {
        if from == to || self.reaches(to, from) {
            return Err(StructuralError::CycleDetected { from, to }.into());
        }
        Ok(())
    }

    fn ensure_not_root(&self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(StructuralError::RootImmutable.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree mutations
    // ------------------------------------------------------------------

    /// Attach a fresh node as the last child of `parent`
    ///
    /// # Errors
    /// `NodeNotFound` for an unknown parent, `DuplicateNode` if a node with
    /// the same id is already attached, `DuplicateAnchor` if the node's
    /// anchor is taken.
    pub fn insert(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        self.node(parent)?;
        let id = node.id();
        if self.contains(id) {
            return Err(StructuralError::DuplicateNode(id).into());
        }
        if let Some(anchor) = node.anchor() {
            self.registry.register(anchor, id)?;
        }
        node.parent = Some(parent);
        node.children.clear();
        node.references.clear();
        node.choice = None;
        self.nodes.insert(id, node);
        self.nodes[&parent].children.push(id);
        PropagationEngine::invalidate(self, id);
        tracing::debug!(node_id = %id, parent = %parent, "node inserted");
        Ok(id)
    }

    /// Create and attach a node
    ///
    /// # Errors
    /// See [`Document::insert`]; also `InvalidAnchor`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        variant: Variant,
        text: &str,
        anchor: Option<&str>,
    ) -> Result<NodeId> {
        let node = Node::new(variant, text, anchor)?;
        self.insert(parent, node)
    }

    /// Remove a node, and with `cascade` its whole subtree
    ///
    /// References and choices held by other nodes that point into the
    /// removed subtree are dropped. Returns the removed ids in pre-order.
    ///
    /// # Errors
    /// `NodeHasChildren` without cascade, `RootImmutable`, `NodeNotFound`.
    pub fn remove(&mut self, id: NodeId, cascade: bool) -> Result<Vec<NodeId>> {
        self.ensure_not_root(id)?;
        let node = self.node(id)?;
        if !cascade && !node.children.is_empty() {
            return Err(StructuralError::NodeHasChildren(id).into());
        }
        let parent = node.parent;
        let removed: Vec<NodeId> = self.traverse_from(id).map(Node::id).collect();
        let doomed: HashSet<NodeId> = removed.iter().copied().collect();
        let mut touched = Vec::new();

        // Outgoing edges of the removed nodes
        for &n in &removed {
            let targets: Vec<NodeId> = self.reference_targets(n).collect();
            for t in targets {
                self.registry.unlink(n, t);
            }
            if let Some(alt) = self.nodes[&n].choice {
                self.registry.unlink(n, alt);
                if !doomed.contains(&alt) {
                    touched.push(alt);
                }
            }
        }

        // Inbound edges from the rest of the document
        for &n in &removed {
            let outside: Vec<NodeId> = self
                .registry
                .referrers(n)
                .filter(|r| !doomed.contains(r))
                .collect();
            let anchor = self.nodes[&n].anchor().map(str::to_string);
            for r in outside {
                let referrer = &mut self.nodes[&r];
                let before = referrer.references.len();
                if let Some(a) = &anchor {
                    referrer.references.retain(|x| x != a);
                }
                let dropped = before - referrer.references.len();
                let cleared = referrer.choice == Some(n);
                if cleared {
                    referrer.choice = None;
                }
                tracing::warn!(
                    referrer = %r,
                    target = %n,
                    dropped_references = dropped,
                    cleared_choice = cleared,
                    "dropping edges into removed node"
                );
                touched.push(r);
            }
            self.registry.forget(n);
            if let Some(a) = &anchor {
                self.registry.unregister(a);
            }
        }

        if let Some(p) = parent {
            self.nodes[&p].children.retain(|c| *c != id);
        }
        for n in &removed {
            self.nodes.shift_remove(n);
            self.pending.remove(n);
        }

        if let Some(p) = parent {
            PropagationEngine::invalidate(self, p);
        }
        for t in touched {
            PropagationEngine::invalidate(self, t);
        }
        tracing::debug!(node_id = %id, removed = removed.len(), "node removed");
        Ok(removed)
    }

    /// Move `id` (with its subtree) to the end of `new_parent`'s children
    ///
    /// # Errors
    /// `CycleDetected` if `new_parent` is `id`, one of its descendants, or
    /// otherwise reachable from it; `RootImmutable`; `NodeNotFound`.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        self.ensure_not_root(id)?;
        self.node(id)?;
        self.node(new_parent)?;
        if id == new_parent || self.reaches(id, new_parent) {
            return Err(StructuralError::CycleDetected {
                from: new_parent,
                to: id,
            }
            .into());
        }
        if let Some(old) = self.nodes[&id].parent {
            PropagationEngine::invalidate(self, old);
            self.nodes[&old].children.retain(|c| *c != id);
        }
        self.nodes[&new_parent].children.push(id);
        self.nodes[&id].parent = Some(new_parent);
        PropagationEngine::invalidate(self, id);
        tracing::debug!(node_id = %id, parent = %new_parent, "node reparented");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute mutations
    // ------------------------------------------------------------------

    /// Apply an explicit status change
    ///
    /// A Question may only be marked resolved while none of its child
    /// Questions is still open.
    ///
    /// # Errors
    /// `InvalidTransition` per the variant's transition table.
    pub fn set_status(&mut self, id: NodeId, to: Status) -> Result<()> {
        self.ensure_not_root(id)?;
        let node = self.node(id)?;
        if to == Status::Question(QuestionState::Resolved) && node.variant() == Variant::Question {
            let open_child = node.children.iter().any(|c| {
                self.get(*c).is_some_and(|n| n.variant() == Variant::Question)
                    && PropagationEngine::peek(self, *c).ok()
                        == Some(Status::Question(QuestionState::Open))
            });
            if open_child {
                return Err(GraphError::invalid_transition(
                    Variant::Question,
                    node.explicit_status(),
                    to,
                ));
            }
        }
        self.node_mut(id)?.transition(to)?;
        PropagationEngine::invalidate(self, id);
        tracing::debug!(node_id = %id, status = %to, "explicit status set");
        Ok(())
    }

    /// Replace a node's text
    ///
    /// # Errors
    /// `NodeNotFound`, `RootImmutable`.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.ensure_not_root(id)?;
        self.node_mut(id)?.set_text(text);
        Ok(())
    }

    /// Set, rename or clear a node's anchor
    ///
    /// Renaming rewrites the references of every node pointing at the old
    /// name. Clearing fails while references still use the anchor.
    ///
    /// # Errors
    /// `InvalidAnchor`, `DuplicateAnchor`, `AnchorInUse`, `NodeNotFound`.
    pub fn set_anchor(&mut self, id: NodeId, anchor: Option<&str>) -> Result<()> {
        self.ensure_not_root(id)?;
        let old = self.node(id)?.anchor().map(str::to_string);
        if old.as_deref() == anchor {
            return Ok(());
        }
        let users: Vec<NodeId> = match &old {
            Some(a) => self
                .registry
                .referrers(id)
                .filter(|r| self.nodes[r].references.iter().any(|x| x == a))
                .collect(),
            None => Vec::new(),
        };
        match anchor {
            Some(new) => {
                validate_anchor(new)?;
                self.registry.register(new, id)?;
                if let Some(a) = &old {
                    self.registry.unregister(a);
                    for u in &users {
                        for r in &mut self.nodes[u].references {
                            if r == a {
                                *r = new.to_string();
                            }
                        }
                    }
                }
            }
            None => {
                if let Some(a) = &old {
                    if !users.is_empty() {
                        return Err(ReferenceError::AnchorInUse {
                            anchor: a.clone(),
                            referrers: users.len(),
                        }
                        .into());
                    }
                    self.registry.unregister(a);
                }
            }
        }
        self.node_mut(id)?.set_anchor(anchor.map(str::to_string));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reference edges
    // ------------------------------------------------------------------

    /// Add a dependency edge from `id` to the node anchored at `anchor`
    ///
    /// Adding an edge that already exists is a no-op.
    ///
    /// # Errors
    /// `UnknownAnchor`, `CycleDetected`, `NodeNotFound`.
    pub fn add_reference(&mut self, id: NodeId, anchor: &str) -> Result<()> {
        self.ensure_not_root(id)?;
        let node = self.node(id)?;
        let target = self.registry.resolve(anchor)?;
        if node.references.iter().any(|a| a == anchor) {
            return Ok(());
        }
        self.ensure_acyclic(id, target)?;
        self.link_reference(id, anchor, target);
        PropagationEngine::invalidate(self, id);
        Ok(())
    }

    fn link_reference(&mut self, id: NodeId, anchor: &str, target: NodeId) {
        self.nodes[&id].references.push(anchor.to_string());
        self.registry.link(id, target);
    }

    /// Remove the dependency edge from `id` to `anchor`
    ///
    /// # Errors
    /// `UnknownAnchor` if the node holds no such reference.
    pub fn remove_reference(&mut self, id: NodeId, anchor: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        let Some(pos) = node.references.iter().position(|a| a == anchor) else {
            return Err(ReferenceError::UnknownAnchor(anchor.to_string()).into());
        };
        node.references.remove(pos);
        if let Some(target) = self.registry.lookup(anchor) {
            self.registry.unlink(id, target);
        }
        PropagationEngine::invalidate(self, id);
        Ok(())
    }

    /// Point a Decision at the Alternative it selects
    ///
    /// Re-selecting replaces the previous choice; selecting the current
    /// choice again is a no-op.
    ///
    /// # Errors
    /// `InvalidTransition` unless `decision` is a Decision and `alternative`
    /// an Alternative; `CycleDetected`.
    pub fn select_alternative(&mut self, decision: NodeId, alternative: NodeId) -> Result<()> {
        let d = self.node(decision)?;
        let a = self.node(alternative)?;
        if d.variant() != Variant::Decision || a.variant() != Variant::Alternative {
            return Err(GraphError::invalid_transition(
                d.variant(),
                d.explicit_status(),
                Status::Decision(DecisionState::Decided),
            ));
        }
        let previous = d.choice;
        if previous == Some(alternative) {
            return Ok(());
        }
        self.ensure_acyclic(decision, alternative)?;
        if let Some(old) = previous {
            self.registry.unlink(decision, old);
            PropagationEngine::invalidate(self, old);
        }
        self.nodes[&decision].choice = Some(alternative);
        self.registry.link(decision, alternative);
        PropagationEngine::invalidate(self, decision);
        PropagationEngine::invalidate(self, alternative);
        tracing::debug!(decision = %decision, alternative = %alternative, "alternative selected");
        Ok(())
    }

    /// Drop a Decision's selection
    ///
    /// # Errors
    /// `InvalidTransition` for non-Decision nodes.
    pub fn clear_selection(&mut self, decision: NodeId) -> Result<()> {
        let d = self.node(decision)?;
        if d.variant() != Variant::Decision {
            return Err(GraphError::invalid_transition(
                d.variant(),
                d.explicit_status(),
                Status::Decision(DecisionState::Pending),
            ));
        }
        if let Some(old) = d.choice {
            self.nodes[&decision].choice = None;
            self.registry.unlink(decision, old);
            PropagationEngine::invalidate(self, old);
            PropagationEngine::invalidate(self, decision);
        }
        Ok(())
    }

    /// Key that names a Decision's choice unambiguously
    ///
    /// The Alternative's anchor if it has one. Otherwise its text, when
    /// [`Document::find_alternative`] maps that text back to the same node.
    /// Otherwise its position among all Alternatives.
    #[must_use]
    pub fn choice_key(&self, decision: NodeId) -> Option<ChoiceKey> {
        let chosen = self.get(decision)?.choice?;
        let alt = self.get(chosen)?;
        if let Some(anchor) = alt.anchor() {
            return Some(ChoiceKey::Name(anchor.to_string()));
        }
        let text = alt.text();
        if !text.is_empty()
            && !text.contains('\n')
            && self.find_alternative(decision, text) == Some(chosen)
        {
            return Some(ChoiceKey::Name(text.to_string()));
        }
        self.alternatives()
            .position(|id| id == chosen)
            .map(|i| ChoiceKey::Position(i + 1))
    }

    /// Alternatives in document order
    fn alternatives(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.traverse()
            .filter(|n| n.variant() == Variant::Alternative)
            .map(Node::id)
    }

    /// Find the Alternative a choice key names, as seen from `decision`
    #[must_use]
    pub fn resolve_choice(&self, decision: NodeId, key: &ChoiceKey) -> Option<NodeId> {
        match key {
            ChoiceKey::Name(name) => self.find_alternative(decision, name),
            ChoiceKey::Position(n) => n.checked_sub(1).and_then(|i| self.alternatives().nth(i)),
        }
    }

    /// Find the Alternative a Decision's choice `key` names
    ///
    /// Looks for an anchored Alternative first, then an Alternative with
    /// that text among the Decision's siblings and children, then the first
    /// such Alternative in document order.
    #[must_use]
    pub fn find_alternative(&self, decision: NodeId, key: &str) -> Option<NodeId> {
        let is_alt = |id: &NodeId| {
            self.get(*id)
                .is_some_and(|n| n.variant() == Variant::Alternative)
        };
        if let Some(id) = self.registry.lookup(key).filter(is_alt) {
            return Some(id);
        }
        let with_text = |id: &NodeId| is_alt(id) && self.nodes[id].text() == key;
        let node = self.get(decision)?;
        let siblings = node
            .parent
            .and_then(|p| self.get(p))
            .map(|p| p.children.as_slice())
            .unwrap_or_default();
        siblings
            .iter()
            .chain(node.children.iter())
            .copied()
            .find(with_text)
            .or_else(|| self.traverse().map(Node::id).find(with_text))
    }

    // ------------------------------------------------------------------
    // Deferred resolution (document loading)
    // ------------------------------------------------------------------

    /// Buffer a dependency edge whose target may appear later in the input
    pub fn defer_reference(&mut self, id: NodeId, anchor: &str, line: usize) {
        self.registry
            .defer(id, PendingTarget::Anchor(anchor.to_string()), line);
    }

    /// Buffer a Decision choice whose target may appear later in the input
    pub fn defer_choice(&mut self, id: NodeId, key: ChoiceKey, line: usize) {
        self.registry.defer(id, PendingTarget::Choice(key), line);
    }

    /// Resolve every buffered edge
    ///
    /// Intended for documents under construction: on error the document is
    /// partially linked and should be discarded.
    ///
    /// # Errors
    /// `DanglingReference` for unresolved targets, `InvalidTransition` for a
    /// choice on a non-Decision, `CycleDetected`.
    pub fn resolve_pending(&mut self) -> Result<()> {
        for pending in self.registry.take_pending() {
            let dangling = || ReferenceError::DanglingReference {
                target: pending.target.to_string(),
                line: pending.line,
            };
            match &pending.target {
                PendingTarget::Anchor(anchor) => {
                    let target = self.registry.lookup(anchor).ok_or_else(dangling)?;
                    if self.nodes[&pending.source].references.contains(anchor) {
                        continue;
                    }
                    self.ensure_acyclic(pending.source, target)?;
                    self.link_reference(pending.source, anchor, target);
                }
                PendingTarget::Choice(key) => {
                    let source = self.node(pending.source)?;
                    if source.variant() != Variant::Decision {
                        return Err(GraphError::invalid_transition(
                            source.variant(),
                            source.explicit_status(),
                            Status::Decision(DecisionState::Decided),
                        ));
                    }
                    let alt = self
                        .resolve_choice(pending.source, key)
                        .ok_or_else(dangling)?;
                    self.select_alternative(pending.source, alt)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Status queries
    // ------------------------------------------------------------------

    /// Effective status, recomputing dirty nodes and caching the result
    ///
    /// # Errors
    /// `NodeNotFound`.
    pub fn effective_status(&mut self, id: NodeId) -> Result<Status> {
        PropagationEngine::effective_status(self, id)
    }

    /// Effective status without touching the cache
    ///
    /// # Errors
    /// `NodeNotFound`.
    pub fn peek_status(&self, id: NodeId) -> Result<Status> {
        PropagationEngine::peek(self, id)
    }

    /// Recompute every dirty node; returns how many were refreshed
    pub fn flush(&mut self) -> usize {
        PropagationEngine::flush(self)
    }

    /// Number of nodes waiting for recomputation
    #[inline]
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.pending.len()
    }

    /// Entries whose effective status blocks their parent: open or blocked
    /// work items and open questions
    #[must_use]
    pub fn blocking_nodes(&self) -> Vec<NodeId> {
        self.traverse()
            .filter(|n| {
                let status = self.peek_status(n.id()).unwrap_or(Status::None);
                match n.variant().family() {
                    Family::WorkItem => !status.is_terminal(),
                    Family::Resolution => status == Status::Question(QuestionState::Open),
                    _ => false,
                }
            })
            .map(Node::id)
            .collect()
    }

    /// Work items that can be picked up now: effective status open or in
    /// progress
    #[must_use]
    pub fn actionable(&self) -> Vec<NodeId> {
        self.traverse()
            .filter(|n| n.variant().is_work_item())
            .filter(|n| {
                self.peek_status(n.id())
                    .is_ok_and(|s| !s.is_terminal() && !s.is_blocked())
            })
            .map(Node::id)
            .collect()
    }
}

/// Lazy pre-order iterator over document nodes
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Traversal<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.doc.get(id)?;
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}
