//! Structured, id-free snapshot of a document
//!
//! Snapshots carry exactly the persisted attributes of every node (variant,
//! text, anchor, explicit status, references, choice and children) and none
//! of the transient state (ids, derived-status caches). Two documents are
//! attribute-equal iff their snapshots compare equal.

use crate::document::Document;
use crate::error::Result;
use crate::model::{Node, NodeId, Status, Variant};
use crate::propagation::PropagationEngine;
use crate::registry::ChoiceKey;
use serde::{Deserialize, Serialize};

/// Whole-document snapshot: the top-level entries in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSnapshot {
    /// Top-level nodes
    pub nodes: Vec<NodeSnapshot>,
}

/// One node and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Variant
    pub variant: Variant,
    /// Text content
    pub text: String,
    /// Anchor, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Explicit status
    pub status: Status,
    /// Referenced anchors, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Selected alternative: its anchor, its text, or its position among
    /// all Alternatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceKey>,
    /// Children, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl OutlineSnapshot {
    /// Total number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        fn count(nodes: &[NodeSnapshot]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.nodes)
    }

    /// No nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Document {
    /// Capture the persisted attributes of every node
    #[must_use]
    pub fn to_snapshot(&self) -> OutlineSnapshot {
        let nodes = self.nodes[&self.root()]
            .children()
            .iter()
            .filter_map(|id| self.snapshot_node(*id))
            .collect();
        OutlineSnapshot { nodes }
    }

    fn snapshot_node(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.get(id)?;
        Some(NodeSnapshot {
            variant: node.variant(),
            text: node.text().to_string(),
            anchor: node.anchor().map(str::to_string),
            status: node.explicit_status(),
            references: node.references().to_vec(),
            choice: self.choice_key(id),
            children: node
                .children()
                .iter()
                .filter_map(|c| self.snapshot_node(*c))
                .collect(),
        })
    }

    /// Rebuild a document from a snapshot
    ///
    /// References and choices are resolved after all nodes exist, so
    /// forward edges are allowed. Line numbers in errors are 1-based
    /// pre-order positions.
    ///
    /// # Errors
    /// Anything [`Document::insert`] or [`Document::resolve_pending`]
    /// reports, plus `InvalidTransition` for statuses outside a variant's
    /// vocabulary.
    pub fn from_snapshot(snapshot: &OutlineSnapshot) -> Result<Self> {
        let mut doc = Document::new();
        let mut position = 0;
        let root = doc.root();
        for node in &snapshot.nodes {
            doc.restore_node(root, node, &mut position)?;
        }
        doc.resolve_pending()?;
        PropagationEngine::refresh_all(&mut doc);
        Ok(doc)
    }

    fn restore_node(
        &mut self,
        parent: NodeId,
        snap: &NodeSnapshot,
        position: &mut usize,
    ) -> Result<()> {
        *position += 1;
        let line = *position;
        let node = Node::new(snap.variant, &snap.text, snap.anchor.as_deref())?
            .with_status(snap.status)?;
        let id = self.insert(parent, node)?;
        for anchor in &snap.references {
            self.defer_reference(id, anchor, line);
        }
        if let Some(key) = &snap.choice {
            self.defer_choice(id, key.clone(), line);
        }
        for child in &snap.children {
            self.restore_node(id, child, position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GraphError, ReferenceError};
    use crate::model::{AlternativeState, QuestionState, WorkState};
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let q = doc
            .add_child(root, Variant::Question, "Pick DB", Some("q1"))
            .unwrap();
        doc.add_child(q, Variant::Alternative, "SQL", None).unwrap();
        let nosql = doc.add_child(q, Variant::Alternative, "NoSQL", None).unwrap();
        let d = doc.add_child(q, Variant::Decision, "Use", None).unwrap();
        doc.select_alternative(d, nosql).unwrap();
        let t = doc.add_child(root, Variant::Task, "Migrate", None).unwrap();
        doc.add_reference(t, "q1").unwrap();
        doc.set_status(t, Status::Work(WorkState::InProgress)).unwrap();
        doc
    }

    #[test]
    fn snapshot_round_trip() {
        let doc = sample();
        let snap = doc.to_snapshot();
        assert_eq!(snap.len(), 5);
        let mut rebuilt = Document::from_snapshot(&snap).unwrap();
        assert_eq!(rebuilt.to_snapshot(), snap);

        let q = rebuilt.by_anchor("q1").unwrap().id();
        assert_eq!(
            rebuilt.effective_status(q).unwrap(),
            Status::Question(QuestionState::Resolved)
        );
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(sample().to_snapshot()).unwrap();
        let decision = &json["nodes"][0]["children"][2];
        assert_eq!(decision["variant"], "Decision");
        assert_eq!(decision["choice"], "NoSQL");
        assert!(decision.get("anchor").is_none());
    }

    #[test]
    fn duplicate_alternative_text_survives_round_trip() {
        let mut doc = Document::new();
        let root = doc.root();
        let q = doc.add_child(root, Variant::Question, "Cache", None).unwrap();
        doc.add_child(q, Variant::Alternative, "Redis", None).unwrap();
        let second = doc.add_child(q, Variant::Alternative, "Redis", None).unwrap();
        let d = doc.add_child(q, Variant::Decision, "Use", None).unwrap();
        doc.select_alternative(d, second).unwrap();

        let snap = doc.to_snapshot();
        assert_eq!(snap.nodes[0].children[2].choice, Some(ChoiceKey::Position(2)));
        let json = serde_json::to_string(&snap).unwrap();
        let back: OutlineSnapshot = serde_json::from_str(&json).unwrap();
        let mut rebuilt = Document::from_snapshot(&back).unwrap();
        assert_eq!(rebuilt.to_snapshot(), snap);

        let alts: Vec<NodeId> = rebuilt.traverse().skip(1).take(2).map(Node::id).collect();
        assert_eq!(
            rebuilt.effective_status(alts[0]).unwrap(),
            Status::Alternative(AlternativeState::Proposed)
        );
        assert_eq!(
            rebuilt.effective_status(alts[1]).unwrap(),
            Status::Alternative(AlternativeState::Selected)
        );
    }

    #[test]
    fn dangling_reference_is_reported() {
        let snap = OutlineSnapshot {
            nodes: vec![NodeSnapshot {
                variant: Variant::Task,
                text: "t".into(),
                anchor: None,
                status: Status::Work(WorkState::Open),
                references: vec!["missing".into()],
                choice: None,
                children: vec![],
            }],
        };
        let err = Document::from_snapshot(&snap).unwrap_err();
        assert_eq!(
            err,
            GraphError::Reference(ReferenceError::DanglingReference {
                target: "missing".into(),
                line: 1,
            })
        );
    }
}
