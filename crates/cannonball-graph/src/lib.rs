//! Cannonball Graph
//!
//! Thread-safe façade over one outline document: mutations, queries,
//! snapshots and persistence.
//!
//! # Example
//!
//! ```rust
//! use cannonball_graph::prelude::*;
//!
//! let manager = GraphManager::load("- [?] Pick DB ^q1\n    - [a] SQL ^sql\n    - [D] Use\n")?;
//! assert_eq!(manager.get_effective_status("q1")?, Status::Question(QuestionState::Open));
//!
//! let decision = manager.children(Some("q1".into()))?[1].id;
//! manager.select_alternative(decision, "sql")?;
//! assert_eq!(manager.get_effective_status("q1")?, Status::Question(QuestionState::Resolved));
//! # Ok::<(), cannonball_graph::ManagerError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod manager;
pub mod query;
pub mod store;

pub use error::{ManagerError, ManagerResult};
pub use manager::GraphManager;
pub use query::{NodeRef, NodeView};
pub use store::{DirectoryStore, MemoryStore, OutlineStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a [`GraphManager`](crate::GraphManager)
    pub use crate::error::{ManagerError, ManagerResult};
    pub use crate::manager::GraphManager;
    pub use crate::query::{NodeRef, NodeView};
    pub use crate::store::{DirectoryStore, MemoryStore, OutlineStore};
    pub use cannonball_core::prelude::*;
}
