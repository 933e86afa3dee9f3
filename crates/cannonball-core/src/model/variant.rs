//! Node variants and their status families

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed category of a node
///
/// The variant is chosen at creation and never changes. It selects the
/// status vocabulary and the propagation rule applied to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    /// Plain bullet without a marker
    Bullet,
    /// Unit of work
    Task,
    /// Open question awaiting a decision
    Question,
    /// Option considered by a decision
    Alternative,
    /// Choice between alternatives
    Decision,
    /// Recorded observation
    Observation,
    /// Desired outcome
    Goal,
    /// Produced artifact
    Artifact,
    /// Problem that must be worked off
    Problem,
    /// Experiment to run
    Experiment,
    /// Meta comment
    Meta,
    /// Worked example
    Example,
    /// Spontaneous idea
    Idea,
    /// Piece of knowledge
    Knowledge,
    /// Location marker
    Location,
}

/// Status family a variant belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Task, Experiment, Problem
    WorkItem,
    /// Question
    Resolution,
    /// Decision, Alternative
    Decision,
    /// Everything without a status
    Inert,
}

impl Variant {
    /// Every variant, in declaration order
    pub const ALL: [Variant; 15] = [
        Variant::Bullet,
        Variant::Task,
        Variant::Question,
        Variant::Alternative,
        Variant::Decision,
        Variant::Observation,
        Variant::Goal,
        Variant::Artifact,
        Variant::Problem,
        Variant::Experiment,
        Variant::Meta,
        Variant::Example,
        Variant::Idea,
        Variant::Knowledge,
        Variant::Location,
    ];

    /// Status family of this variant
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Variant::Task | Variant::Experiment | Variant::Problem => Family::WorkItem,
            Variant::Question => Family::Resolution,
            Variant::Decision | Variant::Alternative => Family::Decision,
            Variant::Bullet
            | Variant::Observation
            | Variant::Goal
            | Variant::Artifact
            | Variant::Meta
            | Variant::Example
            | Variant::Idea
            | Variant::Knowledge
            | Variant::Location => Family::Inert,
        }
    }

    /// True for Task, Experiment and Problem
    #[inline]
    #[must_use]
    pub const fn is_work_item(self) -> bool {
        matches!(self.family(), Family::WorkItem)
    }

    /// Human-readable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Variant::Bullet => "Bullet",
            Variant::Task => "Task",
            Variant::Question => "Question",
            Variant::Alternative => "Alternative",
            Variant::Decision => "Decision",
            Variant::Observation => "Observation",
            Variant::Goal => "Goal",
            Variant::Artifact => "Artifact",
            Variant::Problem => "Problem",
            Variant::Experiment => "Experiment",
            Variant::Meta => "Meta",
            Variant::Example => "Example",
            Variant::Idea => "Idea",
            Variant::Knowledge => "Knowledge",
            Variant::Location => "Location",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
