//! Cannonball Core
//!
//! Typed outline nodes and the engine that keeps their statuses consistent.
//!
//! # Core Concepts
//!
//! - **Node**: a typed outline entry (Task, Question, Decision, ...) with an
//!   explicit status and an optional anchor
//! - **Document**: arena of nodes under a synthetic root, plus the anchor
//!   registry and reverse reference index
//! - **Propagation**: derived statuses (`Blocked`, resolved questions,
//!   selected alternatives) computed lazily from children and references
//!
//! # Architecture
//!
//! ```text
//! mutation → validate → write → invalidate (node, ancestors, referrers)
//!                                     ↓
//! query ────────────────────→ recompute dirty nodes bottom-up → cache
//! ```
//!
//! # Example
//!
//! ```rust
//! use cannonball_core::prelude::*;
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let api = doc.add_child(root, Variant::Task, "Implement API", None)?;
//! let design = doc.add_child(api, Variant::Task, "Design Endpoints", None)?;
//!
//! assert_eq!(doc.effective_status(api)?, Status::Work(WorkState::Blocked));
//! doc.set_status(design, Status::Work(WorkState::Done))?;
//! assert_eq!(doc.effective_status(api)?, Status::Work(WorkState::Open));
//! # Ok::<(), cannonball_core::GraphError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod model;
pub mod propagation;
pub mod registry;
pub mod snapshot;
pub mod state_machine;

pub use document::{Document, Traversal};
pub use error::{ErrorCategory, GraphError, ReferenceError, Result, StateError, StructuralError};
pub use model::{
    AlternativeState, DecisionState, Family, Node, NodeId, QuestionState, Status, StatusCache,
    Variant, WorkState,
};
pub use propagation::PropagationEngine;
pub use registry::{ChoiceKey, PendingReference, PendingTarget, ReferenceRegistry};
pub use snapshot::{NodeSnapshot, OutlineSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with outline documents
    pub use crate::document::Document;
    pub use crate::error::GraphError;
    pub use crate::model::{
        AlternativeState, DecisionState, Node, NodeId, QuestionState, Status, Variant, WorkState,
    };
    pub use crate::registry::ChoiceKey;
    pub use crate::snapshot::OutlineSnapshot;
}
