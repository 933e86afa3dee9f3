//! Error types for the outline engine
//!
//! Errors fall into three categories:
//! - **Structural**: indentation, cycles and tree-shape violations
//! - **Reference**: anchor registration and resolution failures
//! - **State**: status transitions and unknown node markers
//!
//! Every mutating operation either succeeds completely or fails with one of
//! these errors and leaves the document untouched.

use crate::model::{NodeId, Status, Variant};

/// Structural violations of the outline tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Indentation does not describe a valid nesting step
    #[error("malformed indentation on line {line}: {reason}")]
    MalformedIndentation {
        /// 1-based line number of the offending line
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The edge would close a cycle through tree or reference edges
    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Source of the rejected edge
        from: NodeId,
        /// Target of the rejected edge
        to: NodeId,
    },

    /// Non-cascading removal of a node that still has children
    #[error("node {0} has children; removal requires cascade")]
    NodeHasChildren(NodeId),

    /// No node with this id or anchor exists
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node with this id is already attached
    #[error("node {0} is already in the document")]
    DuplicateNode(NodeId),

    /// The synthetic document root cannot be removed or moved
    #[error("the document root cannot be modified")]
    RootImmutable,
}

impl StructuralError {
    /// Create malformed indentation error for a line
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedIndentation {
            line,
            reason: reason.into(),
        }
    }
}

/// Anchor and cross-reference failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// The anchor is already registered to another node
    #[error("duplicate anchor: '^{0}'")]
    DuplicateAnchor(String),

    /// The anchor is not registered
    #[error("unknown anchor: '^{0}'")]
    UnknownAnchor(String),

    /// A reference read during parsing never found its target
    #[error("dangling reference to '{target}' on line {line}")]
    DanglingReference {
        /// Anchor or alternative text that failed to resolve
        target: String,
        /// 1-based line the reference appeared on
        line: usize,
    },

    /// The anchor name contains characters outside `[A-Za-z0-9_-]`
    #[error("invalid anchor name: '{0}'")]
    InvalidAnchor(String),

    /// The anchor still has inbound references
    #[error("anchor '^{anchor}' is still referenced by {referrers} node(s)")]
    AnchorInUse {
        /// Anchor being cleared
        anchor: String,
        /// Number of nodes pointing at it
        referrers: usize,
    },
}

/// Status and marker failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The requested status change is not defined for the node's variant
    #[error("invalid transition for {variant}: {from} -> {to}")]
    InvalidTransition {
        /// Variant of the node
        variant: Variant,
        /// Current explicit status
        from: Status,
        /// Requested status
        to: Status,
    },

    /// Bracket token that does not name any variant
    #[error("unknown node marker '[{marker}]' on line {line}")]
    UnknownNodeMarker {
        /// Token between the brackets
        marker: String,
        /// 1-based line number
        line: usize,
    },
}

/// Error category, used to classify failures without matching every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Tree shape and indentation
    Structural,
    /// Anchors and references
    Reference,
    /// Status transitions and markers
    State,
}

/// Combined engine error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Structural error
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Reference error
    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// State error
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl GraphError {
    /// Category of this error
    #[inline]
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Structural(_) => ErrorCategory::Structural,
            Self::Reference(_) => ErrorCategory::Reference,
            Self::State(_) => ErrorCategory::State,
        }
    }

    /// Shorthand for a missing node
    pub fn not_found(node: impl ToString) -> Self {
        StructuralError::NodeNotFound(node.to_string()).into()
    }

    /// Shorthand for a rejected transition
    pub fn invalid_transition(variant: Variant, from: Status, to: Status) -> Self {
        StateError::InvalidTransition { variant, from, to }.into()
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, GraphError>;
