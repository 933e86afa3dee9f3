//! Line lexer
//!
//! Splits one physical line into its indentation, optional bracket token,
//! text and trailing reference/choice/anchor suffixes. The lexer knows
//! nothing about the token table or nesting; the parser checks both.

use once_cell::sync::Lazy;
use regex::Regex;

static BULLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)-(?:[ \t]+(?P<body>.*?))?[ \t]*$").expect("valid bullet regex")
});
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?P<token>[^\[\]\r\n]{1,3})\](?:[ \t]+|$)").expect("valid token regex")
});
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[ \t])\^(?P<name>[A-Za-z0-9_-]+)$").expect("valid anchor regex")
});
static CHOICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[ \t])\^alt\((?P<target>(?:[^()\\\r\n]|\\.|\((?:[^()\\\r\n]|\\.)*\))+)\)$",
    )
    .expect("valid choice regex")
});
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[ \t])\[\[#\^(?P<name>[A-Za-z0-9_-]+)\]\]$").expect("valid reference regex")
});

/// Classified input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace only
    Blank,
    /// `- ...` entry
    Bullet(BulletLine<'a>),
    /// Soft-wrapped text belonging to the previous entry
    Continuation(&'a str),
}

/// Pieces of a bullet line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletLine<'a> {
    /// Leading whitespace
    pub indent: &'a str,
    /// Text between the brackets of a leading `[..]` token
    pub token: Option<&'a str>,
    /// Free text with suffixes removed
    pub text: &'a str,
    /// `[[#^name]]` targets, in order
    pub references: Vec<&'a str>,
    /// `^alt(target)` target
    pub choice: Option<&'a str>,
    /// Trailing `^name`
    pub anchor: Option<&'a str>,
}

/// Classify a single line (without its newline)
#[must_use]
pub fn lex(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    let Some(caps) = BULLET_RE.captures(line) else {
        return Line::Continuation(line.trim());
    };
    let indent = caps.name("indent").map_or("", |m| m.as_str());
    let mut rest = caps.name("body").map_or("", |m| m.as_str());

    let mut bullet = BulletLine {
        indent,
        ..BulletLine::default()
    };
    if let Some(t) = TOKEN_RE.captures(rest) {
        bullet.token = t.name("token").map(|m| m.as_str());
        rest = &rest[t.get(0).map_or(0, |m| m.end())..];
    }

    if let Some((name, head)) = strip_suffix(&ANCHOR_RE, "name", rest) {
        bullet.anchor = Some(name);
        rest = head;
    }
    if let Some((target, head)) = strip_suffix(&CHOICE_RE, "target", rest) {
        bullet.choice = Some(target);
        rest = head;
    }
    while let Some((name, head)) = strip_suffix(&REFERENCE_RE, "name", rest) {
        bullet.references.push(name);
        rest = head;
    }
    bullet.references.reverse();
    bullet.text = rest.trim();
    Line::Bullet(bullet)
}

/// Whether `text` opens with something the lexer would take as a token
#[must_use]
pub fn starts_with_token(text: &str) -> bool {
    TOKEN_RE.is_match(text)
}

/// Match `re` at the end of `text`; returns the named group and the text
/// before the match
fn strip_suffix<'a>(re: &Regex, group: &str, text: &'a str) -> Option<(&'a str, &'a str)> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let value = caps.name(group)?.as_str();
    Some((value, text[..whole.start()].trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bullet(line: &str) -> BulletLine<'_> {
        match lex(line) {
            Line::Bullet(b) => b,
            other => panic!("not a bullet: {other:?}"),
        }
    }

    #[test]
    fn plain_bullet() {
        let b = bullet("- hello world");
        assert_eq!(b.token, None);
        assert_eq!(b.text, "hello world");
    }

    #[test]
    fn task_with_anchor() {
        let b = bullet("    - [x] Backend Requirements ^req");
        assert_eq!(b.indent, "    ");
        assert_eq!(b.token, Some("x"));
        assert_eq!(b.text, "Backend Requirements");
        assert_eq!(b.anchor, Some("req"));
    }

    #[test]
    fn open_task_token_is_a_space() {
        let b = bullet("- [ ] Implement API");
        assert_eq!(b.token, Some(" "));
        assert_eq!(b.text, "Implement API");
    }

    #[test]
    fn decision_choice() {
        let b = bullet("\t- [D] Use ^alt(NoSQL)");
        assert_eq!(b.indent, "\t");
        assert_eq!(b.token, Some("D"));
        assert_eq!(b.text, "Use");
        assert_eq!(b.choice, Some("NoSQL"));
        assert_eq!(b.anchor, None);
    }

    #[test]
    fn all_suffixes() {
        let b = bullet("- [ ] Ship [[#^a]] [[#^b-2]] ^alt(Plan B) ^ship");
        assert_eq!(b.text, "Ship");
        assert_eq!(b.references, vec!["a", "b-2"]);
        assert_eq!(b.choice, Some("Plan B"));
        assert_eq!(b.anchor, Some("ship"));
    }

    #[test]
    fn choice_target_with_parentheses() {
        let b = bullet(r"- [D] Use ^alt(Postgres (v15)) ^d");
        assert_eq!(b.choice, Some("Postgres (v15)"));
        assert_eq!(b.anchor, Some("d"));
        let b = bullet(r"- [D] Use ^alt(a \) b)");
        assert_eq!(b.choice, Some(r"a \) b"));
        assert_eq!(b.text, "Use");
    }

    #[test]
    fn escaped_suffixes_stay_in_text() {
        let b = bullet(r"- see \^note");
        assert_eq!(b.anchor, None);
        assert_eq!(b.text, r"see \^note");
        let b = bullet(r"- [ ] x [[#\^n0]] \^alt(a)");
        assert_eq!(b.references, Vec::<&str>::new());
        assert_eq!(b.choice, None);
        assert!(!starts_with_token(r"\[x] y"));
        assert!(starts_with_token("[x] y"));
    }

    #[test]
    fn links_are_text() {
        let b = bullet("- [docs](https://example.com) here");
        assert_eq!(b.token, None);
        assert_eq!(b.text, "[docs](https://example.com) here");
    }

    #[test]
    fn empty_entries() {
        assert_eq!(bullet("-").text, "");
        let b = bullet("- [x]");
        assert_eq!(b.token, Some("x"));
        assert_eq!(b.text, "");
    }

    #[test]
    fn continuation_and_blank() {
        assert_eq!(lex("      more text  "), Line::Continuation("more text"));
        assert_eq!(lex("-not a bullet"), Line::Continuation("-not a bullet"));
        assert_eq!(lex("   \t"), Line::Blank);
    }
}
