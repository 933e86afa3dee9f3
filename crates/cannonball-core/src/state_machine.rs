//! Explicit status transitions per variant
//!
//! Only user-initiated changes go through this table. Derived values
//! (`Blocked`, a Question resolved by a decision, an Alternative being
//! selected) are computed by the propagation engine and never validated
//! here. Re-applying the current status is accepted as a no-op.

use crate::error::StateError;
use crate::model::{Family, QuestionState, Status, Variant, WorkState};

/// Validates an explicit status change for a node of `variant`.
///
/// # Errors
/// [`StateError::InvalidTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(variant: Variant, from: Status, to: Status) -> Result<(), StateError> {
    if allowed_transitions(variant, from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::InvalidTransition { variant, from, to })
    }
}

/// Statuses reachable from `from` by an explicit action.
pub fn allowed_transitions(variant: Variant, from: Status) -> Vec<Status> {
    use WorkState::*;
    match (variant.family(), from) {
        (Family::WorkItem, Status::Work(Open | InProgress)) => vec![
            Status::Work(Open),
            Status::Work(InProgress),
            Status::Work(Done),
            Status::Work(Cancelled),
        ],
        (Family::WorkItem, Status::Work(Done | Cancelled)) => {
            vec![Status::Work(Done), Status::Work(Cancelled)]
        }
        (Family::Resolution, Status::Question(_)) => vec![
            Status::Question(QuestionState::Open),
            Status::Question(QuestionState::Resolved),
        ],
        // Decisions change only through selection; alternatives and inert
        // variants have no explicit transitions.
        _ => vec![],
    }
}
