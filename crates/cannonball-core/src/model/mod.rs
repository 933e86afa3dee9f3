//! Node model: variants, status vocabularies and the node record

pub mod node;
pub mod status;
pub mod variant;

pub use node::{validate_anchor, Node, NodeId, StatusCache};
pub use status::{AlternativeState, DecisionState, QuestionState, Status, WorkState};
pub use variant::{Family, Variant};
