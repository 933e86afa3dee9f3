//! Outline node and its derived-status cache

use super::status::{QuestionState, Status, WorkState};
use super::variant::Variant;
use crate::error::{GraphError, ReferenceError, Result};
use crate::state_machine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local node identifier
///
/// Ids are handed out from a process-wide counter and never reused, even
/// across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Last computed effective status plus its invalidation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCache {
    derived: Status,
    dirty: bool,
}

impl StatusCache {
    fn new(initial: Status) -> Self {
        Self {
            derived: initial,
            dirty: true,
        }
    }

    /// Cached value, stale when [`StatusCache::is_dirty`] is set
    #[inline]
    #[must_use]
    pub fn derived(&self) -> Status {
        self.derived
    }

    /// Whether the cached value must be recomputed
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn store(&mut self, status: Status) {
        self.derived = status;
        self.dirty = false;
    }
}

/// A single outline entry
///
/// Tree edges (`parent`, `children`) and reference edges are stored as ids
/// and anchors; ownership of every node lies with the document arena.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    variant: Variant,
    text: String,
    anchor: Option<String>,
    explicit: Status,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) references: Vec<String>,
    pub(crate) choice: Option<NodeId>,
    pub(crate) cache: StatusCache,
}

impl Node {
    /// Create a detached node
    ///
    /// # Errors
    /// Returns [`ReferenceError::InvalidAnchor`] for malformed anchor names.
    pub fn new(variant: Variant, text: &str, anchor: Option<&str>) -> Result<Self> {
        if let Some(a) = anchor {
            validate_anchor(a)?;
        }
        let mut node = Self::bare(variant, text);
        node.anchor = anchor.map(str::to_string);
        Ok(node)
    }

    pub(crate) fn bare(variant: Variant, text: &str) -> Self {
        let explicit = Status::initial(variant);
        Self {
            id: NodeId::next(),
            variant,
            text: normalize_text(text),
            anchor: None,
            explicit,
            parent: None,
            children: Vec::new(),
            references: Vec::new(),
            choice: None,
            cache: StatusCache::new(explicit),
        }
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Variant, fixed at creation
    #[inline]
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Trimmed text content; continuation lines are joined with `\n`
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Anchor name without the leading `^`
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Explicit (user-set) status; never the Blocked overlay
    #[inline]
    #[must_use]
    pub fn explicit_status(&self) -> Status {
        self.explicit
    }

    /// Parent id, `None` for the document root and detached nodes
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child ids
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Anchors this node depends on, in insertion order
    #[inline]
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Alternative selected by this Decision
    #[inline]
    #[must_use]
    pub fn choice(&self) -> Option<NodeId> {
        self.choice
    }

    /// Derived-status cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Apply an explicit status change
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the variant does not define the change;
    /// the node is left unchanged.
    pub fn transition(&mut self, to: Status) -> Result<()> {
        state_machine::validate_transition(self.variant, self.explicit, to)?;
        self.explicit = to;
        self.cache.mark_dirty();
        Ok(())
    }

    /// Mark a work item in progress
    ///
    /// # Errors
    /// `InvalidTransition` for non-work variants or terminal items.
    pub fn start(&mut self) -> Result<()> {
        self.transition(Status::Work(WorkState::InProgress))
    }

    /// Mark a work item done
    ///
    /// # Errors
    /// `InvalidTransition` for non-work variants.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(Status::Work(WorkState::Done))
    }

    /// Mark a work item cancelled
    ///
    /// # Errors
    /// `InvalidTransition` for non-work variants.
    pub fn cancel(&mut self) -> Result<()> {
        self.transition(Status::Work(WorkState::Cancelled))
    }

    /// Mark a question resolved
    ///
    /// # Errors
    /// `InvalidTransition` for anything but a Question.
    pub fn resolve(&mut self) -> Result<()> {
        self.transition(Status::Question(QuestionState::Resolved))
    }

    pub(crate) fn set_text(&mut self, text: &str) {
        self.text = normalize_text(text);
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<String>) {
        self.anchor = anchor;
    }

    /// Replace the initial status with a stored one (parser, snapshot)
    ///
    /// Unlike [`Node::transition`] this accepts any value of the variant's
    /// vocabulary except the derived `Blocked` overlay.
    ///
    /// # Errors
    /// `InvalidTransition` for cross-variant values or `Blocked`.
    pub fn with_status(mut self, status: Status) -> Result<Self> {
        if !status.belongs_to(self.variant) || status.is_blocked() {
            return Err(GraphError::invalid_transition(self.variant, self.explicit, status));
        }
        self.explicit = status;
        self.cache.mark_dirty();
        Ok(self)
    }
}

/// Check an anchor name against `[A-Za-z0-9_-]+`
///
/// # Errors
/// [`ReferenceError::InvalidAnchor`] when empty or containing other characters.
pub fn validate_anchor(anchor: &str) -> Result<()> {
    let valid = !anchor.is_empty()
        && anchor
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ReferenceError::InvalidAnchor(anchor.to_string()).into())
    }
}

fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
