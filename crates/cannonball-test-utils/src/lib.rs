//! Testing utilities for the cannonball workspace
//!
//! Shared fixtures, document builders and proptest strategies.

#![allow(missing_docs)]

use cannonball_core::{
    AlternativeState, ChoiceKey, DecisionState, Document, Node, NodeId, NodeSnapshot,
    OutlineSnapshot, QuestionState, Status, Variant, WorkState,
};
use proptest::prelude::*;

/// Task tree whose root is blocked by an open child
pub const IMPLEMENT_API: &str = "\
- [ ] Implement API
    - [ ] Design Endpoints
        - [x] Backend Requirements
";

/// Question answered by a decision among its children
pub const PICK_DB: &str = "\
- [?] Pick DB ^q1
    - [a] SQL
    - [a] NoSQL
    - [D] Use ^alt(NoSQL)
";

/// Mixed outline: forward references, wrapped text, inert nodes, tabs
pub const RESEARCH_PLAN: &str = "\
- [g] Faster builds ^goal
\t- [P] Link step dominates [[#^profile]]
\t\t- [e] Try mold linker ^mold
\t\t- [e-] Try gold linker
\t- [o] Incremental builds are fine
- [ ] Profile the build ^profile
  measure cold and warm runs
\t- [x] Cold run
\t- [/] Warm run
- [?] Which linker? ^linker
\t- [a] mold ^use-mold
\t- [a] lld
\t- [d] Pick one ^alt(use-mold)
- [ ] Roll out [[#^linker]] [[#^mold]]
";

/// Build a document from `(depth, variant, text, anchor)` rows in pre-order
///
/// Depth 1 rows are top-level. Returns node ids in row order.
pub fn build(rows: &[(usize, Variant, &str, Option<&str>)]) -> (Document, Vec<NodeId>) {
    let mut doc = Document::new();
    let mut scopes = vec![doc.root()];
    let mut ids = Vec::with_capacity(rows.len());
    for (depth, variant, text, anchor) in rows {
        scopes.truncate(*depth);
        let parent = *scopes.last().expect("depth must not skip levels");
        let id = doc.add_child(parent, *variant, text, *anchor).unwrap();
        scopes.push(id);
        ids.push(id);
    }
    (doc, ids)
}

/// Id of the first node with this exact text
pub fn find(doc: &Document, text: &str) -> NodeId {
    doc.traverse()
        .find(|n| n.text() == text)
        .map(Node::id)
        .unwrap_or_else(|| panic!("no node with text {text:?}"))
}

/// Effective statuses in document order, paired with node text
pub fn statuses(doc: &mut Document) -> Vec<(String, Status)> {
    let ids: Vec<(NodeId, String)> = doc
        .traverse()
        .map(|n| (n.id(), n.text().to_string()))
        .collect();
    ids.into_iter()
        .map(|(id, text)| (text, doc.effective_status(id).unwrap()))
        .collect()
}

const VARIANTS: [Variant; 15] = Variant::ALL;

fn explicit_status(variant: Variant, pick: usize) -> Status {
    use WorkState::*;
    match variant {
        Variant::Question if pick % 2 == 1 => Status::Question(QuestionState::Resolved),
        Variant::Question => Status::Question(QuestionState::Open),
        Variant::Decision => Status::Decision(DecisionState::Pending),
        Variant::Alternative => Status::Alternative(AlternativeState::Proposed),
        v if v.is_work_item() => Status::Work([Open, InProgress, Done, Cancelled][pick % 4]),
        _ => Status::None,
    }
}

#[derive(Debug, Clone)]
struct Row {
    level: usize,
    variant: Variant,
    lines: Vec<String>,
    anchored: bool,
    status_pick: usize,
    reference_picks: Vec<usize>,
    choice_pick: usize,
}

/// Words that look like markup when written back
const LOOKALIKES: &[&str] = &[
    "[x]", "[ ]", "^note", "^alt(a)", "[[#^n0]]", "-", "\\", "(v15)", ")", "#2", "SQL",
];

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,8}",
        1 => prop::sample::select(LOOKALIKES).prop_map(str::to_string),
    ]
}

fn row() -> impl Strategy<Value = Row> {
    (
        0..4usize,
        0..VARIANTS.len(),
        prop::collection::vec(prop::collection::vec(word(), 1..4), 1..3),
        any::<bool>(),
        0..4usize,
        prop::collection::vec(any::<usize>(), 0..3),
        any::<usize>(),
    )
        .prop_map(|(level, v, lines, anchored, status_pick, reference_picks, choice_pick)| Row {
            level,
            variant: VARIANTS[v],
            lines: lines.into_iter().map(|words| words.join(" ")).collect(),
            anchored,
            status_pick,
            reference_picks,
            choice_pick,
        })
}

/// Arbitrary valid outline snapshot, in the canonical form
/// [`Document::to_snapshot`] produces
///
/// References and choices only point backwards in document order at nodes
/// that are not ancestors, which keeps every generated outline acyclic.
/// Unanchored alternatives are chosen by position, and text mixes in
/// words that look like tokens, anchors and suffixes.
pub fn arb_snapshot() -> impl Strategy<Value = OutlineSnapshot> {
    prop::collection::vec(row(), 0..24).prop_map(|rows| {
        Document::from_snapshot(&assemble(&rows))
            .expect("generated outlines are valid")
            .to_snapshot()
    })
}

fn assemble(rows: &[Row]) -> OutlineSnapshot {
    let mut flat: Vec<(usize, NodeSnapshot)> = Vec::with_capacity(rows.len());
    // ancestors[i] holds the indices above row i
    let mut ancestors: Vec<Vec<usize>> = Vec::with_capacity(rows.len());
    let mut chain: Vec<usize> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let level = row.level.min(chain.len());
        chain.truncate(level);
        ancestors.push(chain.clone());

        let anchor = row.anchored.then(|| format!("n{i}"));
        let visible = |j: &usize| !chain.contains(j);
        let earlier: Vec<usize> = (0..i)
            .filter(visible)
            .filter(|j| flat[*j].1.anchor.is_some())
            .collect();
        let mut references: Vec<String> = Vec::new();
        if !earlier.is_empty() {
            for pick in &row.reference_picks {
                let target = format!("n{}", earlier[pick % earlier.len()]);
                if !references.contains(&target) {
                    references.push(target);
                }
            }
        }

        let choice = if row.variant == Variant::Decision {
            let alternatives: Vec<usize> = (0..i)
                .filter(visible)
                .filter(|j| flat[*j].1.variant == Variant::Alternative)
                .collect();
            (!alternatives.is_empty()).then(|| {
                let j = alternatives[row.choice_pick % alternatives.len()];
                match &flat[j].1.anchor {
                    Some(anchor) => ChoiceKey::Name(anchor.clone()),
                    None => ChoiceKey::Position(
                        flat[..=j]
                            .iter()
                            .filter(|(_, n)| n.variant == Variant::Alternative)
                            .count(),
                    ),
                }
            })
        } else {
            None
        };

        flat.push((
            level,
            NodeSnapshot {
                variant: row.variant,
                text: row.lines.join("\n"),
                anchor,
                status: explicit_status(row.variant, row.status_pick),
                references,
                choice,
                children: Vec::new(),
            },
        ));
        chain.push(i);
    }

    let mut pos = 0;
    OutlineSnapshot {
        nodes: nest(&flat, &mut pos, 0),
    }
}

fn nest(flat: &[(usize, NodeSnapshot)], pos: &mut usize, level: usize) -> Vec<NodeSnapshot> {
    let mut out = Vec::new();
    while let Some((l, node)) = flat.get(*pos) {
        if *l < level {
            break;
        }
        *pos += 1;
        let mut node = node.clone();
        node.children = nest(flat, pos, level + 1);
        out.push(node);
    }
    out
}
