//! Low-level handling of formspec text: escape-aware splitting, unescaping,
//! and element tokenization.
//!
//! A formspec string is a sequence of `keyword[argument;argument;...]`
//! elements with no separators between them. Within arguments, the characters
//! `;`, `,`, `]`, and `\` may be escaped with a backslash. The distinct
//! "enriched text" escape syntax (`\x1b(...)`) is passed through untouched;
//! it is consumed by the text-rendering collaborator, not this layer.

use std::borrow::Cow;

/// The newest formspec language version this implementation fully understands.
///
/// Elements declared in a formspec with a higher `formspec_version[]` are
/// still parsed; extra trailing arguments they carry are tolerated and
/// ignored rather than rejected.
pub const FORMSPEC_API_VERSION: u16 = 4;

/// One top-level `keyword[args]` element, borrowed from the source string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Element<'a> {
    pub(crate) keyword: &'a str,
    pub(crate) args: &'a str,
}

impl<'a> Element<'a> {
    /// Splits `keyword[args` (the trailing `]` having been consumed by
    /// [`split_elements`]) at the first unescaped `[`.
    ///
    /// Returns `None` for text that contains no bracket at all, which the
    /// driver ignores the same way the reference client does.
    pub(crate) fn from_raw(raw: &'a str) -> Option<Self> {
        let bracket = find_unescaped(raw, '[')?;
        Some(Element {
            keyword: raw[..bracket].trim(),
            args: &raw[bracket + 1..],
        })
    }
}

/// Splits a whole formspec string into top-level elements on unescaped `]`.
///
/// Empty segments (as produced by `]]` or a trailing `]`) are kept; the
/// element dispatcher skips them. No unescaping happens at this stage.
pub(crate) fn split_elements(s: &str) -> Vec<&str> {
    split_escaped(s, ']')
}

/// Splits on `sep`, treating `\x` (for any `x`) as an indivisible pair.
///
/// The backslashes are left in place; apply [`unescape`] to the pieces that
/// are free-form strings.
pub(crate) fn split_escaped(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            // Skip the escaped character, if any.
            chars.next();
        } else if c == sep {
            out.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&s[start..]);
    out
}

fn find_unescaped(s: &str, target: char) -> Option<usize> {
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == target {
            return Some(i);
        }
    }
    None
}

/// Removes backslash escapes: `\x` becomes `x` for every character except the
/// ESC introducing an enriched-text sequence, which survives verbatim.
pub(crate) fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\x1b') => {
                    out.push('\\');
                    out.push('\x1b');
                }
                Some(escaped) => out.push(escaped),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// If `element` is a `formspec_version[N]` directive, returns `N`.
///
/// Versions below 1 and unparsable numbers are rejected (`None`), matching
/// the reference client, which then treats the element as an ordinary —
/// unknown — one.
pub(crate) fn parse_version(element: &str) -> Option<u16> {
    let parsed = Element::from_raw(element)?;
    if parsed.keyword != "formspec_version" {
        return None;
    }
    match parsed.args.trim().parse::<u16>() {
        Ok(v) if v >= 1 => Some(v),
        _ => None,
    }
}

/// Parses a boolean argument the way the DSL spells them.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_elements_basic() {
        assert_eq!(
            split_elements("size[8,9]button[0,0;2,1;ok;OK]"),
            vec!["size[8,9", "button[0,0;2,1;ok;OK", ""],
        );
    }

    #[test]
    fn split_respects_escapes() {
        assert_eq!(
            split_escaped(r"a\;b;c", ';'),
            vec![r"a\;b", "c"],
        );
        assert_eq!(
            split_elements(r"label[0,0;tricky \] bracket]"),
            vec![r"label[0,0;tricky \] bracket", ""],
        );
    }

    #[test]
    fn unescape_removes_backslashes() {
        assert_eq!(unescape(r"a\;b\\c"), r"a;b\c");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn unescape_keeps_enriched_sequences() {
        let enriched = "\\\u{1b}(c@#FF0000)red";
        assert_eq!(unescape(enriched), enriched);
    }

    #[test]
    fn element_tokenization() {
        assert_eq!(
            Element::from_raw(" button [0,0;2,1;ok;OK"),
            Some(Element {
                keyword: "button",
                args: "0,0;2,1;ok;OK"
            }),
        );
        assert_eq!(Element::from_raw("no brackets here"), None);
    }

    #[test]
    fn version_directive() {
        assert_eq!(parse_version("formspec_version[3"), Some(3));
        assert_eq!(parse_version("formspec_version[0"), None);
        assert_eq!(parse_version("formspec_version[x"), None);
        assert_eq!(parse_version("size[8,9"), None);
    }
}
