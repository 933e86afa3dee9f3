//! Backslash escapes for entry text and choice keys
//!
//! Text is written so that the lexer never mistakes it for markup: every
//! `\` and `^` on a bullet line is escaped (so no anchor, reference or
//! choice suffix can form), a leading `[..]` that would read as a token is
//! escaped, and a continuation line starting with `-` is escaped so it does
//! not open a new bullet. Choice keys escape `\`, both parentheses and a
//! leading `#`.
//!
//! [`unescape`] only decodes the sequences written here; any other
//! backslash is kept literally.

use crate::lexer;

const ESCAPABLE: &[char] = &['\\', '^', '[', ']', '(', ')', '-', '#'];

/// Escape the first line of an entry's text
#[must_use]
pub fn escape_first_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    if lexer::starts_with_token(line) {
        out.push('\\');
    }
    for c in line.chars() {
        if matches!(c, '\\' | '^') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a continuation line of an entry's text
#[must_use]
pub fn escape_continuation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    if line.starts_with('-') {
        out.push('\\');
    }
    for c in line.chars() {
        if c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a choice key written inside `^alt(..)`
#[must_use]
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    if key.starts_with('#') {
        out.push('\\');
    }
    for c in key.chars() {
        if matches!(c, '\\' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Decode the escapes produced by this module
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek().filter(|n| ESCAPABLE.contains(*n)) {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Whether `text` holds `pattern` outside any backslash escape
#[must_use]
pub fn contains_unescaped(text: &str, pattern: &str) -> bool {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if text[i..].starts_with(pattern) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn token_like_prefix() {
        assert_eq!(escape_first_line("[x] literally"), r"\[x] literally");
        assert_eq!(escape_first_line("[docs](https://example.com)"), "[docs](https://example.com)");
        assert_eq!(unescape(r"\[x] literally"), "[x] literally");
    }

    #[test]
    fn carets_and_backslashes() {
        let line = r"see ^note in C:\tmp";
        let escaped = escape_first_line(line);
        assert_eq!(escaped, r"see \^note in C:\\tmp");
        assert_eq!(unescape(&escaped), line);
    }

    #[test]
    fn continuation_dash() {
        assert_eq!(escape_continuation("- b"), r"\- b");
        assert_eq!(escape_continuation("a - b"), "a - b");
        assert_eq!(unescape(r"\- b"), "- b");
    }

    #[test]
    fn keys() {
        assert_eq!(escape_key("Postgres (v15)"), r"Postgres \(v15\)");
        assert_eq!(escape_key("#2"), r"\#2");
        assert_eq!(unescape(r"Postgres \(v15\)"), "Postgres (v15)");
    }

    #[test]
    fn unknown_escapes_are_literal() {
        assert_eq!(unescape(r"C:\path\n"), r"C:\path\n");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn unescaped_search() {
        assert!(contains_unescaped("use ^alt(x", "^alt("));
        assert!(!contains_unescaped(r"use \^alt(x", "^alt("));
        assert!(contains_unescaped(r"use \\^alt(x", "^alt("));
    }
}
