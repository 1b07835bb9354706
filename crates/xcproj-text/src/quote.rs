//! Quoting and escaping of string tokens.
//!
//! A string is written bare when it is non-empty, consists only of ASCII
//! alphanumerics, `.`, `/` and `_`, and cannot be mistaken for the start
//! of a comment. Everything else is quoted.

use std::borrow::Cow;

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_')
}

/// Whether `s` must be quoted to survive a round trip.
pub fn needs_quotes(s: &str) -> bool {
    s.is_empty() || !s.chars().all(is_safe_char) || s.contains("//")
}

/// Escape the contents of a quoted string.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Render `s` as a token, quoting only when required.
pub fn quote(s: &str) -> Cow<'_, str> {
    if needs_quotes(s) {
        Cow::Owned(format!("\"{}\"", escape(s)))
    } else {
        Cow::Borrowed(s)
    }
}
