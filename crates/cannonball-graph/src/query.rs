//! Query API types
//!
//! Collaborators address nodes by id or anchor and receive owned
//! [`NodeView`]s, so no borrow of the locked document escapes the manager.

use cannonball_core::{Document, Node, NodeId, Result, Status, Variant};
use serde::Serialize;
use std::fmt;

/// Node address: an id, or an anchor name without the `^`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Process-local id
    Id(NodeId),
    /// Anchor name
    Anchor(String),
}

impl NodeRef {
    /// Resolve to an id in `doc`
    ///
    /// # Errors
    /// `NodeNotFound` for unknown ids, `UnknownAnchor` for unknown anchors.
    pub fn resolve(&self, doc: &Document) -> Result<NodeId> {
        match self {
            NodeRef::Id(id) => doc.node(*id).map(Node::id),
            NodeRef::Anchor(anchor) => doc.by_anchor(anchor).map(Node::id),
        }
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

impl From<&str> for NodeRef {
    fn from(anchor: &str) -> Self {
        NodeRef::Anchor(anchor.trim_start_matches('^').to_string())
    }
}

impl From<String> for NodeRef {
    fn from(anchor: String) -> Self {
        NodeRef::from(anchor.as_str())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "{id}"),
            NodeRef::Anchor(a) => write!(f, "^{a}"),
        }
    }
}

/// Owned snapshot of one node and its derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    /// Node id
    pub id: NodeId,
    /// Variant
    pub variant: Variant,
    /// Text
    pub text: String,
    /// Anchor
    pub anchor: Option<String>,
    /// Explicit status
    pub explicit_status: Status,
    /// Effective (derived) status
    pub effective_status: Status,
    /// Parent id; `None` for top-level entries
    pub parent: Option<NodeId>,
    /// Child ids
    pub children: Vec<NodeId>,
    /// Referenced anchors
    pub references: Vec<String>,
    /// Selected alternative
    pub choice: Option<NodeId>,
    /// Nesting depth, 1 for top-level entries
    pub depth: usize,
}

impl NodeView {
    /// Capture `node` from `doc`
    ///
    /// Reads the cached status when clean and recomputes otherwise, without
    /// writing to the document.
    #[must_use]
    pub fn capture(doc: &Document, node: &Node) -> Self {
        let parent = node.parent().filter(|p| *p != doc.root());
        Self {
            id: node.id(),
            variant: node.variant(),
            text: node.text().to_string(),
            anchor: node.anchor().map(str::to_string),
            explicit_status: node.explicit_status(),
            effective_status: doc.peek_status(node.id()).unwrap_or(Status::None),
            parent,
            children: node.children().to_vec(),
            references: node.references().to_vec(),
            choice: node.choice(),
            depth: doc.depth(node.id()),
        }
    }

    /// One-line summary used by the CLI
    #[must_use]
    pub fn summary(&self) -> String {
        let indent = "  ".repeat(self.depth.saturating_sub(1));
        let first = self.text.lines().next().unwrap_or("");
        match &self.anchor {
            Some(a) => format!(
                "{indent}{} [{}] {first} ^{a}",
                self.variant, self.effective_status
            ),
            None => format!("{indent}{} [{}] {first}", self.variant, self.effective_status),
        }
    }
}
