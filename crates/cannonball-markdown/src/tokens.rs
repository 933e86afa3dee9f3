//! Bracket status tokens
//!
//! A token such as `[x]` after the bullet selects both the variant and the
//! explicit status of a node. The table is closed per codec: the built-in
//! set below, optionally extended by [`TokenOverride`]s from configuration.
//! Every (variant, status) pair that can be written has exactly one
//! canonical token; aliases are accepted on input only.

use crate::error::{ConfigError, ConfigResult};
use cannonball_core::{
    AlternativeState, DecisionState, QuestionState, Status, Variant, WorkState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Longest token accepted between the brackets
pub const MAX_TOKEN_LEN: usize = 3;

/// Variant and explicit status selected by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker {
    /// Node variant
    pub variant: Variant,
    /// Explicit status
    pub status: Status,
}

impl Marker {
    const fn new(variant: Variant, status: Status) -> Self {
        Self { variant, status }
    }
}

const fn work(variant: Variant, state: WorkState) -> Marker {
    Marker::new(variant, Status::Work(state))
}

const fn inert(variant: Variant) -> Marker {
    Marker::new(variant, Status::None)
}

/// Built-in tokens: (token, marker, canonical)
const STANDARD: &[(&str, Marker, bool)] = &[
    (" ", work(Variant::Task, WorkState::Open), true),
    ("/", work(Variant::Task, WorkState::InProgress), true),
    ("x", work(Variant::Task, WorkState::Done), true),
    ("-", work(Variant::Task, WorkState::Cancelled), true),
    ("!", work(Variant::Task, WorkState::Open), false),
    ("e", work(Variant::Experiment, WorkState::Open), true),
    ("%", work(Variant::Experiment, WorkState::Open), false),
    ("e/", work(Variant::Experiment, WorkState::InProgress), true),
    ("E", work(Variant::Experiment, WorkState::Done), true),
    ("e-", work(Variant::Experiment, WorkState::Cancelled), true),
    ("P", work(Variant::Problem, WorkState::Open), true),
    ("P/", work(Variant::Problem, WorkState::InProgress), true),
    ("Px", work(Variant::Problem, WorkState::Done), true),
    ("P-", work(Variant::Problem, WorkState::Cancelled), true),
    ("?", Marker::new(Variant::Question, Status::Question(QuestionState::Open)), true),
    ("q", Marker::new(Variant::Question, Status::Question(QuestionState::Open)), false),
    ("Q", Marker::new(Variant::Question, Status::Question(QuestionState::Resolved)), true),
    ("a", Marker::new(Variant::Alternative, Status::Alternative(AlternativeState::Proposed)), true),
    ("D", Marker::new(Variant::Decision, Status::Decision(DecisionState::Pending)), true),
    ("d", Marker::new(Variant::Decision, Status::Decision(DecisionState::Pending)), false),
    ("$", Marker::new(Variant::Decision, Status::Decision(DecisionState::Pending)), false),
    ("o", inert(Variant::Observation), true),
    ("g", inert(Variant::Goal), true),
    ("G", inert(Variant::Goal), false),
    ("~", inert(Variant::Goal), false),
    ("A", inert(Variant::Artifact), true),
    ("m", inert(Variant::Meta), true),
    ("\"", inert(Variant::Example), true),
    ("I", inert(Variant::Idea), true),
    ("i", inert(Variant::Knowledge), true),
    ("l", inert(Variant::Location), true),
];

/// Extra token declared in configuration
///
/// ```toml
/// [[tokens]]
/// token = "X"
/// variant = "Task"
/// status = "done"
/// canonical = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOverride {
    /// Text between the brackets
    pub token: String,
    /// Variant the token creates
    pub variant: Variant,
    /// Status label (`open`, `in-progress`, `done`, ...); defaults to the
    /// variant's initial status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Write this token instead of the built-in one
    #[serde(default)]
    pub canonical: bool,
}

/// Statuses a node of `variant` can carry explicitly
#[must_use]
pub fn explicit_statuses(variant: Variant) -> Vec<Status> {
    use WorkState::*;
    match variant {
        Variant::Question => vec![
            Status::Question(QuestionState::Open),
            Status::Question(QuestionState::Resolved),
        ],
        v if v.is_work_item() => [Open, InProgress, Done, Cancelled]
            .into_iter()
            .map(Status::Work)
            .collect(),
        v => vec![Status::initial(v)],
    }
}

/// Bidirectional token table
#[derive(Debug, Clone)]
pub struct TokenTable {
    lookup: HashMap<String, Marker>,
    canonical: HashMap<Marker, String>,
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TokenTable {
    /// Built-in table
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self {
            lookup: HashMap::new(),
            canonical: HashMap::new(),
        };
        for (token, marker, canonical) in STANDARD {
            table.lookup.insert((*token).to_string(), *marker);
            if *canonical {
                table.canonical.insert(*marker, (*token).to_string());
            }
        }
        table
    }

    /// Built-in table extended by configuration overrides
    ///
    /// # Errors
    /// [`ConfigError::DuplicateToken`] when a token is already mapped,
    /// [`ConfigError::InvalidToken`] for malformed tokens or statuses.
    pub fn with_overrides(overrides: &[TokenOverride]) -> ConfigResult<Self> {
        let mut table = Self::standard();
        for o in overrides {
            let marker = o.marker()?;
            if table.lookup.contains_key(&o.token) {
                return Err(ConfigError::DuplicateToken(o.token.clone()));
            }
            table.lookup.insert(o.token.clone(), marker);
            if o.canonical {
                table.canonical.insert(marker, o.token.clone());
            }
        }
        Ok(table)
    }

    /// Marker for a token
    #[inline]
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<Marker> {
        self.lookup.get(token).copied()
    }

    /// Token to write for a node; `None` for plain bullets
    ///
    /// Statuses without a token of their own (a Decision stored as decided,
    /// for instance) fall back to the variant's initial token.
    #[must_use]
    pub fn token_for(&self, variant: Variant, status: Status) -> Option<&str> {
        self.canonical
            .get(&Marker::new(variant, status))
            .or_else(|| {
                self.canonical
                    .get(&Marker::new(variant, Status::initial(variant)))
            })
            .map(String::as_str)
    }

    /// Number of accepted tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// No tokens
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

impl TokenOverride {
    fn marker(&self) -> ConfigResult<Marker> {
        let len = self.token.chars().count();
        if len == 0 || len > MAX_TOKEN_LEN {
            return Err(ConfigError::invalid_token(
                &self.token,
                format!("tokens must be 1 to {MAX_TOKEN_LEN} characters"),
            ));
        }
        if self.token.contains(['[', ']', '\n', '\r']) {
            return Err(ConfigError::invalid_token(&self.token, "brackets and newlines are not allowed"));
        }
        if self.variant == Variant::Bullet {
            return Err(ConfigError::invalid_token(&self.token, "plain bullets carry no token"));
        }
        let status = match &self.status {
            None => Status::initial(self.variant),
            Some(label) => explicit_statuses(self.variant)
                .into_iter()
                .find(|s| s.label() == label)
                .ok_or_else(|| {
                    ConfigError::invalid_token(
                        &self.token,
                        format!("'{label}' is not an explicit status of {}", self.variant),
                    )
                })?,
        };
        Ok(Marker::new(self.variant, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_explicit_status_has_a_token() {
        let table = TokenTable::standard();
        for v in Variant::ALL {
            for s in explicit_statuses(v) {
                let token = table.token_for(v, s);
                if v == Variant::Bullet {
                    assert_eq!(token, None);
                    continue;
                }
                let token = token.unwrap_or_else(|| panic!("{v} {s}"));
                assert_eq!(table.lookup(token), Some(Marker::new(v, s)));
            }
        }
    }

    #[test]
    fn decision_aliases() {
        let table = TokenTable::standard();
        for alias in ["d", "$", "D"] {
            assert_eq!(table.lookup(alias).map(|m| m.variant), Some(Variant::Decision));
        }
        let pending = Status::Decision(DecisionState::Pending);
        assert_eq!(table.token_for(Variant::Decision, pending), Some("D"));
        let decided = Status::Decision(DecisionState::Decided);
        assert_eq!(table.token_for(Variant::Decision, decided), Some("D"));
    }

    #[test]
    fn legacy_aliases_read_but_never_written() {
        let table = TokenTable::standard();
        let cases = [
            ("q", Variant::Question, Status::Question(QuestionState::Open), "?"),
            ("!", Variant::Task, Status::Work(WorkState::Open), " "),
            ("G", Variant::Goal, Status::None, "g"),
            ("~", Variant::Goal, Status::None, "g"),
            ("%", Variant::Experiment, Status::Work(WorkState::Open), "e"),
        ];
        for (alias, variant, status, written) in cases {
            assert_eq!(table.lookup(alias), Some(Marker::new(variant, status)), "{alias}");
            assert_eq!(table.token_for(variant, status), Some(written), "{alias}");
        }
    }

    #[test]
    fn overrides_extend_and_replace_canonical() {
        let table = TokenTable::with_overrides(&[TokenOverride {
            token: "X".into(),
            variant: Variant::Task,
            status: Some("done".into()),
            canonical: true,
        }])
        .unwrap();
        let done = Status::Work(WorkState::Done);
        assert_eq!(table.token_for(Variant::Task, done), Some("X"));
        assert_eq!(table.lookup("x"), Some(Marker::new(Variant::Task, done)));
    }

    #[test]
    fn duplicate_override_rejected() {
        let err = TokenTable::with_overrides(&[TokenOverride {
            token: "x".into(),
            variant: Variant::Goal,
            status: None,
            canonical: false,
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateToken(t) if t == "x"));
    }

    #[test]
    fn override_status_must_match_variant() {
        let err = TokenTable::with_overrides(&[TokenOverride {
            token: "R".into(),
            variant: Variant::Task,
            status: Some("resolved".into()),
            canonical: false,
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToken { .. }));
    }
}
