//! Markdown outline serializer
//!
//! Writes one bullet per node with the token reconstructed from the node's
//! explicit status; the derived overlay is never persisted. Continuation
//! lines of multi-line text are indented two spaces past their bullet.
//! Text and choice keys are escaped (see [`crate::escape`]).

use crate::escape::{escape_continuation, escape_first_line, escape_key};
use crate::tokens::TokenTable;
use cannonball_core::{ChoiceKey, Document, Node};
use std::fmt::Write as _;

/// Outline serializer
#[derive(Debug)]
pub struct Serializer<'t> {
    tokens: &'t TokenTable,
    unit: String,
}

impl<'t> Serializer<'t> {
    /// Create serializer writing `unit` once per nesting level
    #[must_use]
    pub fn new(tokens: &'t TokenTable, unit: impl Into<String>) -> Self {
        Self {
            tokens,
            unit: unit.into(),
        }
    }

    /// Render the whole document
    #[must_use]
    pub fn serialize(&self, doc: &Document) -> String {
        let mut out = String::new();
        for node in doc.traverse() {
            let indent = self.unit.repeat(doc.depth(node.id()).saturating_sub(1));
            self.write_node(&mut out, doc, node, &indent);
        }
        out
    }

    fn write_node(&self, out: &mut String, doc: &Document, node: &Node, indent: &str) {
        let mut lines = node.text().lines();
        let mut parts: Vec<String> = Vec::new();
        if let Some(token) = self.tokens.token_for(node.variant(), node.explicit_status()) {
            parts.push(format!("[{token}]"));
        }
        if let Some(first) = lines.next() {
            parts.push(escape_first_line(first));
        }
        parts.extend(node.references().iter().map(|r| format!("[[#^{r}]]")));
        match doc.choice_key(node.id()) {
            Some(ChoiceKey::Name(name)) => parts.push(format!("^alt({})", escape_key(&name))),
            Some(key @ ChoiceKey::Position(_)) => parts.push(format!("^alt({key})")),
            None => {}
        }
        if let Some(anchor) = node.anchor() {
            parts.push(format!("^{anchor}"));
        }

        if parts.is_empty() {
            let _ = writeln!(out, "{indent}-");
        } else {
            let _ = writeln!(out, "{indent}- {}", parts.join(" "));
        }
        for rest in lines {
            let _ = writeln!(out, "{indent}  {}", escape_continuation(rest));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cannonball_core::{Status, Variant, WorkState};
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_status_not_overlay() {
        let mut doc = Document::new();
        let root = doc.root();
        let api = doc.add_child(root, Variant::Task, "Implement API", None).unwrap();
        let child = doc.add_child(api, Variant::Task, "Design", None).unwrap();
        doc.set_status(child, Status::Work(WorkState::InProgress)).unwrap();
        assert!(doc.effective_status(api).unwrap().is_blocked());

        let tokens = TokenTable::standard();
        let text = Serializer::new(&tokens, "    ").serialize(&doc);
        assert_eq!(text, "- [ ] Implement API\n    - [/] Design\n");
    }

    #[test]
    fn suffix_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let q = doc.add_child(root, Variant::Question, "Pick", Some("q1")).unwrap();
        let alt = doc.add_child(q, Variant::Alternative, "SQL", Some("sql")).unwrap();
        let d = doc.add_child(q, Variant::Decision, "Use", Some("d1")).unwrap();
        doc.select_alternative(d, alt).unwrap();
        let t = doc.add_child(root, Variant::Task, "Ship", None).unwrap();
        doc.add_reference(t, "d1").unwrap();

        let tokens = TokenTable::standard();
        let text = Serializer::new(&tokens, "\t").serialize(&doc);
        assert_eq!(
            text,
            "- [?] Pick ^q1\n\t- [a] SQL ^sql\n\t- [D] Use ^alt(sql) ^d1\n- [ ] Ship [[#^d1]]\n"
        );
    }

    #[test]
    fn markup_in_text_is_escaped() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.add_child(root, Variant::Bullet, "[x] literally", None).unwrap();
        doc.add_child(root, Variant::Task, "see ^note", Some("n")).unwrap();
        doc.add_child(root, Variant::Idea, "a\n- b", None).unwrap();
        let q = doc.add_child(root, Variant::Question, "q", None).unwrap();
        doc.add_child(q, Variant::Alternative, "SQL", None).unwrap();
        let second = doc.add_child(q, Variant::Alternative, "SQL", None).unwrap();
        let pg = doc.add_child(q, Variant::Alternative, "Postgres (v15)", None).unwrap();
        let d1 = doc.add_child(q, Variant::Decision, "one", None).unwrap();
        let d2 = doc.add_child(q, Variant::Decision, "two", None).unwrap();
        doc.select_alternative(d1, second).unwrap();
        doc.select_alternative(d2, pg).unwrap();

        let tokens = TokenTable::standard();
        let text = Serializer::new(&tokens, "  ").serialize(&doc);
        assert_eq!(
            text,
            concat!(
                "- \\[x] literally\n",
                "- [ ] see \\^note ^n\n",
                "- [I] a\n",
                "  \\- b\n",
                "- [?] q\n",
                "  - [a] SQL\n",
                "  - [a] SQL\n",
                "  - [a] Postgres (v15)\n",
                "  - [D] one ^alt(#2)\n",
                "  - [D] two ^alt(Postgres \\(v15\\))\n",
            )
        );
    }

    #[test]
    fn multi_line_text_and_empty_bullet() {
        let mut doc = Document::new();
        let root = doc.root();
        let n = doc.add_child(root, Variant::Idea, "first\nsecond", None).unwrap();
        doc.add_child(n, Variant::Bullet, "", None).unwrap();

        let tokens = TokenTable::standard();
        let text = Serializer::new(&tokens, "  ").serialize(&doc);
        assert_eq!(text, "- [I] first\n  second\n  -\n");
    }
}
