//! Markdown outline parser
//!
//! Builds the tree first, buffering references and choices in the
//! document's registry, then resolves them once the whole input has been
//! read (forward references are allowed) and finally runs one propagation
//! pass over the whole document.

use crate::config::IndentStyle;
use crate::escape::{contains_unescaped, unescape};
use crate::lexer::{self, BulletLine, Line};
use crate::tokens::TokenTable;
use cannonball_core::{
    ChoiceKey, Document, GraphError, Node, NodeId, PropagationEngine, Result, StateError,
    StructuralError, Variant,
};

/// Line-oriented outline parser
#[derive(Debug)]
pub struct Parser<'t> {
    tokens: &'t TokenTable,
    indent: IndentStyle,
}

/// Node whose text may still grow through continuation lines
struct OpenEntry {
    id: NodeId,
    text: String,
}

impl<'t> Parser<'t> {
    /// Create parser over a token table
    #[must_use]
    pub fn new(tokens: &'t TokenTable, indent: IndentStyle) -> Self {
        Self { tokens, indent }
    }

    /// Parse a whole document
    ///
    /// # Errors
    /// `MalformedIndentation`, `UnknownNodeMarker`, `DuplicateAnchor`,
    /// `DanglingReference`, `CycleDetected`, or `InvalidTransition` for a
    /// choice on a non-Decision line. Errors carry 1-based line numbers
    /// where the failure is tied to a line.
    pub fn parse(&self, input: &str) -> Result<Document> {
        let mut doc = Document::new();
        let mut unit = self.indent.unit();
        // scopes[k] is the latest entry at nesting level k
        let mut scopes: Vec<NodeId> = Vec::new();
        let mut open: Option<OpenEntry> = None;

        for (index, raw) in input.lines().enumerate() {
            let line = index + 1;
            match lexer::lex(raw) {
                Line::Blank => {}
                Line::Continuation(text) => match open.as_mut() {
                    Some(entry) => {
                        entry.text.push('\n');
                        entry.text.push_str(&unescape(text));
                    }
                    None => {
                        return Err(StructuralError::malformed(line, "text before the first bullet").into())
                    }
                },
                Line::Bullet(bullet) => {
                    let level = indent_level(bullet.indent, &mut unit, line)?;
                    if level > scopes.len() {
                        return Err(StructuralError::malformed(
                            line,
                            format!("nesting jumps from level {} to {level}", scopes.len()),
                        )
                        .into());
                    }
                    scopes.truncate(level);
                    let parent = scopes.last().copied().unwrap_or_else(|| doc.root());

                    flush_text(&mut doc, open.take())?;
                    let text = unescape(bullet.text);
                    let id = self.add_entry(&mut doc, parent, &bullet, &text, line)?;
                    scopes.push(id);
                    open = Some(OpenEntry { id, text });
                }
            }
        }
        flush_text(&mut doc, open.take())?;

        doc.resolve_pending()?;
        let refreshed = PropagationEngine::refresh_all(&mut doc);
        tracing::debug!(nodes = doc.len(), refreshed, "outline parsed");
        Ok(doc)
    }

    fn add_entry(
        &self,
        doc: &mut Document,
        parent: NodeId,
        bullet: &BulletLine<'_>,
        text: &str,
        line: usize,
    ) -> Result<NodeId> {
        let node = match bullet.token {
            None => Node::new(Variant::Bullet, text, bullet.anchor)?,
            Some(token) => {
                let marker = self.tokens.lookup(token).ok_or_else(|| {
                    GraphError::from(StateError::UnknownNodeMarker {
                        marker: token.to_string(),
                        line,
                    })
                })?;
                Node::new(marker.variant, text, bullet.anchor)?.with_status(marker.status)?
            }
        };
        let id = doc.insert(parent, node)?;
        for reference in &bullet.references {
            doc.defer_reference(id, reference, line);
        }
        match bullet.choice {
            Some(choice) => doc.defer_choice(id, choice_key(choice), line),
            None if contains_unescaped(bullet.text, "^alt(") => {
                tracing::warn!(line, "malformed ^alt(..) choice kept as text");
            }
            None => {}
        }
        Ok(id)
    }
}

/// `#N` names the N-th Alternative; anything else is an anchor or a text
fn choice_key(raw: &str) -> ChoiceKey {
    raw.strip_prefix('#')
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .map_or_else(|| ChoiceKey::Name(unescape(raw)), ChoiceKey::Position)
}

fn flush_text(doc: &mut Document, entry: Option<OpenEntry>) -> Result<()> {
    match entry {
        Some(e) if e.text.contains('\n') => doc.set_text(e.id, &e.text),
        _ => Ok(()),
    }
}

/// Nesting level of an indentation prefix
///
/// With no fixed unit yet, the first non-empty prefix becomes the unit.
fn indent_level(indent: &str, unit: &mut Option<String>, line: usize) -> Result<usize> {
    if indent.is_empty() {
        return Ok(0);
    }
    if indent.contains(' ') && indent.contains('\t') {
        return Err(StructuralError::malformed(line, "mixed tabs and spaces").into());
    }
    let unit = unit.get_or_insert_with(|| indent.to_string());
    let whole_units = indent.len() % unit.len() == 0 && indent.starts_with(unit.as_str());
    if !whole_units {
        return Err(StructuralError::malformed(
            line,
            format!("indentation is not a multiple of {:?}", unit.as_str()),
        )
        .into());
    }
    Ok(indent.len() / unit.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cannonball_core::{AlternativeState, ReferenceError, Status, WorkState};

    fn parse(input: &str) -> Result<Document> {
        Parser::new(&TokenTable::standard(), IndentStyle::Auto).parse(input)
    }

    fn texts(doc: &Document) -> Vec<(usize, String)> {
        doc.traverse()
            .map(|n| (doc.depth(n.id()), n.text().to_string()))
            .collect()
    }

    #[test]
    fn nesting_follows_indentation() {
        let doc = parse("- a\n  - b\n    - c\n  - d\n- e\n").unwrap();
        assert_eq!(
            texts(&doc),
            vec![
                (1, "a".into()),
                (2, "b".into()),
                (3, "c".into()),
                (2, "d".into()),
                (1, "e".into()),
            ]
        );
    }

    #[test]
    fn tabs_are_detected() {
        let doc = parse("- a\n\t- b\n\t\t- c\n").unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(texts(&doc)[2], (3, "c".into()));
    }

    #[test]
    fn jump_of_two_levels_is_malformed() {
        let err = parse("- a\n  - b\n      - c\n").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::MalformedIndentation { line: 3, .. })
        ));
    }

    #[test]
    fn first_line_cannot_be_indented() {
        let err = parse("  - a\n").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::MalformedIndentation { line: 1, .. })
        ));
    }

    #[test]
    fn partial_unit_is_malformed() {
        let err = parse("- a\n    - b\n      - c\n").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Structural(StructuralError::MalformedIndentation { line: 3, .. })
        ));
    }

    #[test]
    fn unknown_marker() {
        let err = parse("- ok\n- [zz] what\n").unwrap_err();
        assert_eq!(
            err,
            GraphError::State(StateError::UnknownNodeMarker {
                marker: "zz".into(),
                line: 2
            })
        );
    }

    #[test]
    fn continuation_lines_join_text() {
        let doc = parse("- [ ] long\n  wrapped text\n- next\n").unwrap();
        let first = doc.traverse().next().unwrap();
        assert_eq!(first.text(), "long\nwrapped text");
        assert_eq!(first.variant(), Variant::Task);
    }

    #[test]
    fn leading_text_is_malformed() {
        assert!(parse("intro\n- a\n").is_err());
    }

    #[test]
    fn forward_reference_resolves() {
        let mut doc = parse("- [ ] ship [[#^tests]]\n- [ ] write tests ^tests\n").unwrap();
        let ship = doc.traverse().next().unwrap().id();
        assert_eq!(
            doc.effective_status(ship).unwrap(),
            Status::Work(WorkState::Blocked)
        );
    }

    #[test]
    fn dangling_reference_names_line() {
        let err = parse("- a\n- [ ] b [[#^nowhere]]\n").unwrap_err();
        assert_eq!(
            err,
            GraphError::Reference(ReferenceError::DanglingReference {
                target: "nowhere".into(),
                line: 2
            })
        );
    }

    #[test]
    fn duplicate_anchor() {
        let err = parse("- a ^x\n- b ^x\n").unwrap_err();
        assert!(matches!(err, GraphError::Reference(ReferenceError::DuplicateAnchor(_))));
    }

    #[test]
    fn choice_on_task_is_rejected() {
        let err = parse("- [a] SQL\n- [ ] pick ^alt(SQL)\n").unwrap_err();
        assert!(matches!(err, GraphError::State(StateError::InvalidTransition { .. })));
    }

    #[test]
    fn escaped_text_is_decoded() {
        let doc = parse("- \\[x] literally\n- [ ] see \\^note\n- [I] a\n  \\- b\n").unwrap();
        let nodes: Vec<&Node> = doc.traverse().collect();
        assert_eq!(nodes[0].variant(), Variant::Bullet);
        assert_eq!(nodes[0].text(), "[x] literally");
        assert_eq!(nodes[1].text(), "see ^note");
        assert_eq!(nodes[1].anchor(), None);
        assert_eq!(nodes[2].text(), "a\n- b");
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn positional_choice() {
        let mut doc = parse("- [?] q\n    - [a] SQL\n    - [a] SQL\n    - [D] Use ^alt(#2)\n").unwrap();
        let alts: Vec<NodeId> = doc.traverse().skip(1).take(2).map(Node::id).collect();
        assert_eq!(
            doc.effective_status(alts[1]).unwrap(),
            Status::Alternative(AlternativeState::Selected)
        );
        assert_eq!(choice_key("#12"), ChoiceKey::Position(12));
        assert_eq!(choice_key("#"), ChoiceKey::Name("#".into()));
        assert_eq!(choice_key(r"\#2"), ChoiceKey::Name("#2".into()));
        assert!(parse("- [?] q\n    - [a] SQL\n    - [D] Use ^alt(#3)\n").is_err());
    }

    #[test]
    fn fixed_indent_is_enforced() {
        let tokens = TokenTable::standard();
        let parser = Parser::new(&tokens, IndentStyle::Spaces(2));
        assert!(parser.parse("- a\n  - b\n").is_ok());
        assert!(parser.parse("- a\n\t- b\n").is_err());
    }
}
