//! Status propagation engine
//!
//! Derives each node's effective status from its explicit status, its
//! children and its resolved reference edges. Results are cached on the
//! node ([`StatusCache`](crate::model::StatusCache)) and invalidated
//! explicitly by every mutation: the mutated node, its ancestor chain and
//! every node that references anything on that chain are marked dirty.
//! Queries recompute dirty nodes bottom-up on demand.
//!
//! Rules, by family:
//! - **Work items** overlay `Blocked` on a non-terminal explicit status when
//!   a work-item child is not terminal, a child Question is open, or a
//!   referenced node is not satisfied.
//! - **Questions** are resolved when explicitly marked so, or when a
//!   Decision below them (not inside a nested Question) or referenced by
//!   them has selected an Alternative.
//! - **Decisions** are decided while their choice points at an Alternative.
//! - **Alternatives** are selected while any Decision chooses them.
//! - **Inert** nodes have no status.

use crate::document::Document;
use crate::error::Result;
use crate::model::{
    AlternativeState, DecisionState, Family, NodeId, QuestionState, Status, Variant, WorkState,
};
use std::collections::{HashMap, HashSet};

type Memo = HashMap<NodeId, Status>;

/// Stateless propagation rules over a [`Document`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationEngine;

impl PropagationEngine {
    /// Mark `id` and everything whose status may depend on it dirty
    ///
    /// A dirty node's parent and referrers are always dirty as well, so
    /// the walk stops at nodes reached through an edge that are already
    /// dirty. `id` itself is always expanded since its edges may be new.
    pub fn invalidate(doc: &mut Document, id: NodeId) {
        let root = doc.root();
        let mut work = vec![id];
        let mut seen = HashSet::new();
        while let Some(n) = work.pop() {
            if n == root || !seen.insert(n) {
                continue;
            }
            let Some(node) = doc.nodes.get_mut(&n) else {
                continue;
            };
            if n != id && node.cache.is_dirty() && doc.pending.contains(&n) {
                continue;
            }
            node.cache.mark_dirty();
            work.extend(node.parent);
            doc.pending.insert(n);
            work.extend(doc.registry().referrers(n));
        }
    }

    /// Invalidate several nodes at once
    pub fn invalidate_many(doc: &mut Document, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            Self::invalidate(doc, id);
        }
    }

    /// Effective status of `id`, recomputing and caching every dirty node it
    /// depends on
    ///
    /// # Errors
    /// `NodeNotFound` if `id` is not in the document.
    pub fn effective_status(doc: &mut Document, id: NodeId) -> Result<Status> {
        doc.node(id)?;
        let mut memo = Memo::new();
        let status = compute(doc, id, &mut memo);
        store(doc, memo);
        Ok(status)
    }

    /// Effective status of `id` without writing any cache
    ///
    /// # Errors
    /// `NodeNotFound` if `id` is not in the document.
    pub fn peek(doc: &Document, id: NodeId) -> Result<Status> {
        doc.node(id)?;
        Ok(compute(doc, id, &mut Memo::new()))
    }

    /// Recompute all pending nodes; returns how many were refreshed
    pub fn flush(doc: &mut Document) -> usize {
        let pending: Vec<NodeId> = doc.pending.iter().copied().collect();
        let mut memo = Memo::new();
        for id in pending {
            compute(doc, id, &mut memo);
        }
        let refreshed = memo.len();
        store(doc, memo);
        if refreshed > 0 {
            tracing::debug!(refreshed, "propagation pass");
        }
        refreshed
    }

    /// Invalidate and recompute the whole document (after a load)
    pub fn refresh_all(doc: &mut Document) -> usize {
        let ids: Vec<NodeId> = doc.traverse().map(|n| n.id()).collect();
        for id in &ids {
            doc.nodes[id].cache.mark_dirty();
        }
        doc.pending.extend(ids);
        Self::flush(doc)
    }
}

fn store(doc: &mut Document, memo: Memo) {
    for (id, status) in memo {
        if let Some(node) = doc.nodes.get_mut(&id) {
            node.cache.store(status);
        }
        doc.pending.remove(&id);
    }
}

/// Status of `id`: the clean cached value, or a fresh computation recorded
/// in `memo`
///
/// Dirty dependencies are evaluated in post-order from an explicit stack,
/// so outline depth is bounded by memory rather than the call stack.
/// Every dependency of a node (children, reference targets, choice) is
/// computed before the node itself, which keeps clean nodes above clean
/// dependencies.
fn compute(doc: &Document, id: NodeId, memo: &mut Memo) -> Status {
    if let Some(status) = known(doc, id, memo) {
        return status;
    }
    let mut stack = vec![(id, false)];
    let mut entered = HashSet::new();
    while let Some((n, ready)) = stack.pop() {
        if known(doc, n, memo).is_some() {
            continue;
        }
        if ready {
            let status = evaluate(doc, n, memo);
            memo.insert(n, status);
        } else if entered.insert(n) {
            stack.push((n, true));
            let pending: Vec<NodeId> = doc
                .dependencies(n)
                .into_iter()
                .filter(|d| known(doc, *d, memo).is_none())
                .collect();
            stack.extend(pending.into_iter().map(|d| (d, false)));
        }
    }
    status_of(doc, id, memo)
}

/// Clean cached or memoized status; `None` while still dirty
fn known(doc: &Document, id: NodeId, memo: &Memo) -> Option<Status> {
    match doc.get(id) {
        None => Some(Status::None),
        Some(node) if !node.cache().is_dirty() => Some(node.cache().derived()),
        Some(_) => memo.get(&id).copied(),
    }
}

fn status_of(doc: &Document, id: NodeId, memo: &Memo) -> Status {
    known(doc, id, memo).unwrap_or(Status::None)
}

/// Apply the family rule to `id`; its dependencies are already known
fn evaluate(doc: &Document, id: NodeId, memo: &Memo) -> Status {
    let node = &doc.nodes[&id];
    match node.variant().family() {
        Family::Inert => Status::None,
        Family::WorkItem => work_item(doc, id, memo),
        Family::Resolution => question(doc, id, memo),
        Family::Decision if node.variant() == Variant::Decision => decision(doc, id),
        Family::Decision => alternative(doc, id),
    }
}

fn work_item(doc: &Document, id: NodeId, memo: &Memo) -> Status {
    let node = &doc.nodes[&id];
    let explicit = node.explicit_status();
    if explicit.is_terminal() {
        return explicit;
    }
    let child_blocks = node.children().iter().any(|c| {
        let Some(child) = doc.get(*c) else {
            return false;
        };
        match child.variant().family() {
            Family::WorkItem => !status_of(doc, *c, memo).is_terminal(),
            Family::Resolution => status_of(doc, *c, memo) == Status::Question(QuestionState::Open),
            _ => false,
        }
    });
    let blocked = child_blocks
        || doc
            .reference_targets(id)
            .any(|t| !status_of(doc, t, memo).is_satisfied());
    if blocked {
        Status::Work(WorkState::Blocked)
    } else {
        explicit
    }
}

fn question(doc: &Document, id: NodeId, memo: &Memo) -> Status {
    let resolved = Status::Question(QuestionState::Resolved);
    let explicit = doc.nodes[&id].explicit_status();
    if explicit == resolved {
        return resolved;
    }
    let referenced: Vec<NodeId> = doc.reference_targets(id).collect();
    let decided = owned_decisions(doc, id)
        .into_iter()
        .chain(referenced)
        .filter(|d| doc.get(*d).is_some_and(|n| n.variant() == Variant::Decision))
        .any(|d| status_of(doc, d, memo) == Status::Decision(DecisionState::Decided));
    if decided {
        resolved
    } else {
        explicit
    }
}

/// Decisions below `question` that are not nested inside another Question
fn owned_decisions(doc: &Document, question: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = doc.nodes[&question].children().to_vec();
    while let Some(id) = stack.pop() {
        let Some(node) = doc.get(id) else {
            continue;
        };
        match node.variant() {
            Variant::Question => {}
            Variant::Decision => {
                found.push(id);
                stack.extend(node.children());
            }
            _ => stack.extend(node.children()),
        }
    }
    found
}

fn decision(doc: &Document, id: NodeId) -> Status {
    let chosen = doc.nodes[&id]
        .choice()
        .and_then(|alt| doc.get(alt))
        .is_some_and(|alt| alt.variant() == Variant::Alternative);
    if chosen {
        Status::Decision(DecisionState::Decided)
    } else {
        Status::Decision(DecisionState::Pending)
    }
}

fn alternative(doc: &Document, id: NodeId) -> Status {
    let selected = doc
        .registry()
        .referrers(id)
        .any(|r| doc.get(r).is_some_and(|n| n.choice() == Some(id)));
    if selected {
        Status::Alternative(AlternativeState::Selected)
    } else {
        Status::Alternative(AlternativeState::Proposed)
    }
}
