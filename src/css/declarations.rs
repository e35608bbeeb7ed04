//! Declaration blocks: `prop: value; prop: value !important`

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Lowercased property name.
    pub property: String,
    /// Value with whitespace runs collapsed and `!important` removed.
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.trim().to_ascii_lowercase(),
            value: collapse_whitespace(value.trim()),
            important: false,
        }
    }

    /// Minified `prop:value` form.
    #[must_use]
    pub fn to_css(&self) -> String {
        if self.important {
            format!("{}:{}!important", self.property, self.value)
        } else {
            format!("{}:{}", self.property, self.value)
        }
    }

    /// Whether the value is the given keyword, ignoring case.
    #[must_use]
    pub fn value_is(&self, keyword: &str) -> bool {
        self.value.eq_ignore_ascii_case(keyword)
    }

    /// Whether the value is a zero length (`0`, `0px`, `0%`...).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        let number = self
            .value
            .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
        number.parse::<f64>().is_ok_and(|n| n == 0.0)
    }
}

/// Parse the body of a declaration block. Malformed declarations (no colon,
/// empty name or value) are skipped.
#[must_use]
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let text = strip_comments(text);
    split_top_level(&text, ';')
        .into_iter()
        .filter_map(parse_one)
        .collect()
}

fn parse_one(raw: &str) -> Option<Declaration> {
    let (property, value) = raw.split_once(':')?;
    let property = property.trim();
    if property.is_empty()
        || !property
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }

    let mut value = value.trim();
    let mut important = false;
    if let Some(bang) = value.rfind('!') {
        if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            important = true;
            value = value[..bang].trim_end();
        }
    }
    if value.is_empty() {
        return None;
    }

    let mut declaration = Declaration::new(property, value);
    declaration.important = important;
    Some(declaration)
}

/// Minified declaration list, `;`-separated with no trailing separator.
#[must_use]
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(Declaration::to_css)
        .collect::<Vec<_>>()
        .join(";")
}

/// Remove `/* ... */` comments outside of strings. An unterminated comment
/// runs to the end of the input.
pub(crate) fn strip_comments(text: &str) -> Cow<'_, str> {
    if !text.contains("/*") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                out.push(c);
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
            }
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Split on `separator` outside of strings, parentheses and brackets.
/// Empty pieces are dropped.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\\' => escaped = true,
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ if c == separator && depth == 0 => {
                    pieces.push(&text[start..index]);
                    start = index + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.trim().is_empty());
    pieces
}

/// Collapse runs of whitespace into single spaces, leaving strings alone.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    for c in text.chars() {
        if quote.is_none() && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            _ => {}
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let decls = parse_declarations(" Color : red ; margin:0  auto;; bogus ; width:100px !IMPORTANT");
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[1].value, "0 auto");
        assert!(decls[2].important);
        assert_eq!(
            serialize_declarations(&decls),
            "color:red;margin:0 auto;width:100px!important"
        );
    }

    #[test]
    fn test_semicolons_inside_urls_and_strings() {
        let decls = parse_declarations(
            "background:url(data:image/png;base64,AAA);content:\"a;b\"",
        );
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "url(data:image/png;base64,AAA)");
        assert_eq!(decls[1].value, "\"a;b\"");
    }

    #[test]
    fn test_comments_are_removed() {
        assert_eq!(strip_comments("a/* x */b"), "ab");
        assert_eq!(strip_comments("content:'/*'"), "content:'/*'");
        let decls = parse_declarations("color:/* note */blue");
        assert_eq!(decls[0].value, "blue");
    }

    #[test]
    fn test_zero_detection() {
        assert!(Declaration::new("top", "0").is_zero());
        assert!(Declaration::new("top", "0px").is_zero());
        assert!(!Declaration::new("top", "1px").is_zero());
    }
}
