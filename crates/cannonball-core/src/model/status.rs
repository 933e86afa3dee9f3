//! Per-family status vocabularies

use super::variant::{Family, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;

/// States of the work-item family (Task, Experiment, Problem)
///
/// `Blocked` is never stored as an explicit value; it only appears as the
/// derived overlay computed by the propagation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkState {
    /// Not started
    Open,
    /// Being worked on
    InProgress,
    /// Waiting on an unresolved dependency (derived only)
    Blocked,
    /// Finished
    Done,
    /// Abandoned
    Cancelled,
}

impl WorkState {
    /// Done or Cancelled
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, WorkState::Done | WorkState::Cancelled)
    }
}

/// States of a Question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionState {
    /// Awaiting an answer
    Open,
    /// Answered by a decision or marked resolved
    Resolved,
}

/// States of a Decision, driven by its selected alternative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionState {
    /// No alternative selected
    Pending,
    /// An alternative is selected
    Decided,
}

/// Read-only state of an Alternative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlternativeState {
    /// Not chosen by any decision
    Proposed,
    /// Chosen by at least one decision
    Selected,
}

/// Status value of any node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Inert variants carry no status
    None,
    /// Work-item family
    Work(WorkState),
    /// Resolution family
    Question(QuestionState),
    /// Decision
    Decision(DecisionState),
    /// Alternative
    Alternative(AlternativeState),
}

impl Status {
    /// Initial status for a freshly created node of `variant`
    #[must_use]
    pub const fn initial(variant: Variant) -> Self {
        match variant {
            Variant::Question => Status::Question(QuestionState::Open),
            Variant::Decision => Status::Decision(DecisionState::Pending),
            Variant::Alternative => Status::Alternative(AlternativeState::Proposed),
            v if v.is_work_item() => Status::Work(WorkState::Open),
            _ => Status::None,
        }
    }

    /// Whether this value belongs to the vocabulary of `variant`
    #[must_use]
    pub const fn belongs_to(self, variant: Variant) -> bool {
        matches!(
            (variant.family(), self, variant),
            (Family::WorkItem, Status::Work(_), _)
                | (Family::Resolution, Status::Question(_), _)
                | (Family::Decision, Status::Decision(_), Variant::Decision)
                | (Family::Decision, Status::Alternative(_), Variant::Alternative)
                | (Family::Inert, Status::None, _)
        )
    }

    /// Whether a node in this status stops blocking nodes that reference it
    ///
    /// Terminal work items, resolved questions, selected alternatives and
    /// decided decisions are satisfied; inert nodes always are.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        match self {
            Status::None => true,
            Status::Work(w) => w.is_terminal(),
            Status::Question(q) => matches!(q, QuestionState::Resolved),
            Status::Decision(d) => matches!(d, DecisionState::Decided),
            Status::Alternative(a) => matches!(a, AlternativeState::Selected),
        }
    }

    /// Work item in Done or Cancelled
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Status::Work(w) if w.is_terminal())
    }

    /// Carries the derived Blocked overlay
    #[inline]
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Status::Work(WorkState::Blocked))
    }

    /// Lowercase label used in logs and CLI output
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Status::None => "none",
            Status::Work(WorkState::Open) | Status::Question(QuestionState::Open) => "open",
            Status::Work(WorkState::InProgress) => "in-progress",
            Status::Work(WorkState::Blocked) => "blocked",
            Status::Work(WorkState::Done) => "done",
            Status::Work(WorkState::Cancelled) => "cancelled",
            Status::Question(QuestionState::Resolved) => "resolved",
            Status::Decision(DecisionState::Pending) => "pending",
            Status::Decision(DecisionState::Decided) => "decided",
            Status::Alternative(AlternativeState::Proposed) => "proposed",
            Status::Alternative(AlternativeState::Selected) => "selected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_statuses_belong_to_variant() {
        for v in Variant::ALL {
            assert!(Status::initial(v).belongs_to(v), "{v}");
        }
    }

    #[test]
    fn cross_variant_values_rejected() {
        assert!(!Status::Question(QuestionState::Open).belongs_to(Variant::Task));
        assert!(!Status::Decision(DecisionState::Pending).belongs_to(Variant::Alternative));
        assert!(!Status::Work(WorkState::Open).belongs_to(Variant::Goal));
        assert!(Status::Work(WorkState::Done).belongs_to(Variant::Problem));
    }

    #[test]
    fn satisfaction() {
        assert!(Status::None.is_satisfied());
        assert!(Status::Work(WorkState::Cancelled).is_satisfied());
        assert!(!Status::Work(WorkState::Blocked).is_satisfied());
        assert!(!Status::Question(QuestionState::Open).is_satisfied());
        assert!(Status::Alternative(AlternativeState::Selected).is_satisfied());
    }
}
