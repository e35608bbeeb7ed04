//! Tolerant stylesheet parser
//!
//! Not a CSS tokenizer: it only finds rule boundaries (respecting strings,
//! parentheses and nested blocks) and hands declaration blocks to
//! [`parse_declarations`]. Anything it cannot make sense of is skipped and
//! reported in [`ParsedStylesheet::errors`].

use super::declarations::{collapse_whitespace, parse_declarations, split_top_level, strip_comments};
use super::rules::{
    ConditionalRule, CssRule, KeyframesRule, OtherAtRule, ParsedStylesheet, StyleRule,
};

/// At-rules whose block holds nested rules.
const CONDITIONAL_AT_RULES: &[&str] = &["media", "supports", "document", "-moz-document"];

/// Parse a whole stylesheet.
#[must_use]
pub fn parse_stylesheet(source: &str) -> ParsedStylesheet {
    let text = strip_comments(source);
    let mut parser = Parser {
        input: &text,
        pos: 0,
        errors: Vec::new(),
    };
    let rules = parser.rules(false);
    ParsedStylesheet {
        rules,
        errors: parser.errors,
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    errors: Vec<String>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Rules until end of input, or until the closing brace of the current
    /// block when `nested`.
    fn rules(&mut self, nested: bool) -> Vec<CssRule> {
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                if nested {
                    self.errors.push("unterminated block".to_string());
                }
                return rules;
            }
            if rest.starts_with('}') {
                self.pos += 1;
                if nested {
                    return rules;
                }
                self.errors.push("unexpected '}'".to_string());
                continue;
            }
            // Stray HTML comment delimiters are allowed at the top level.
            if let Some(after) = rest.strip_prefix("<!--").or_else(|| rest.strip_prefix("-->")) {
                self.pos = self.input.len() - after.len();
                continue;
            }
            if rest.starts_with('@') {
                if let Some(rule) = self.at_rule() {
                    rules.push(rule);
                }
            } else if let Some(rule) = self.style_rule() {
                rules.push(CssRule::Style(rule));
            }
        }
    }

    /// Text up to (not including) the first top-level `{` or `;`.
    fn prelude(&mut self) -> (&'a str, Option<char>) {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (index, c) in rest.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '{' | ';' | '}' if depth == 0 => {
                    self.pos += index;
                    return (&rest[..index], Some(c));
                }
                _ => {}
            }
        }
        self.pos = self.input.len();
        (rest, None)
    }

    /// Raw content of the block starting at the current `{`, consuming the
    /// matching `}`.
    fn block(&mut self) -> &'a str {
        debug_assert!(self.rest().starts_with('{'));
        self.pos += 1;
        let rest = self.rest();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (index, c) in rest.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' | '\'' => quote = Some(c),
                '{' => depth += 1,
                '}' if depth == 0 => {
                    self.pos += index + 1;
                    return &rest[..index];
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        self.errors.push("unterminated block".to_string());
        self.pos = self.input.len();
        rest
    }

    fn style_rule(&mut self) -> Option<StyleRule> {
        let (prelude, terminator) = self.prelude();
        match terminator {
            Some('{') => {
                let body = self.block();
                let selectors: Vec<String> = split_top_level(prelude, ',')
                    .into_iter()
                    .map(|s| collapse_whitespace(s.trim()))
                    .collect();
                if selectors.is_empty() {
                    self.errors.push(format!("rule without selector: {{{}}}", body.trim()));
                    return None;
                }
                Some(StyleRule {
                    selectors,
                    declarations: parse_declarations(body),
                })
            }
            Some(c) => {
                // A '}' may close the enclosing block; leave it to `rules`.
                if c != '}' {
                    self.pos += c.len_utf8();
                }
                self.errors.push(format!("unexpected '{c}' after '{}'", prelude.trim()));
                None
            }
            None => {
                self.errors.push(format!("selector without block: {}", prelude.trim()));
                None
            }
        }
    }

    fn at_rule(&mut self) -> Option<CssRule> {
        self.pos += 1;
        let rest = self.rest();
        let keyword_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        let keyword = rest[..keyword_len].to_ascii_lowercase();
        self.pos += keyword_len;

        let (prelude, terminator) = self.prelude();
        let prelude = collapse_whitespace(prelude.trim());

        match terminator {
            Some('{') => {
                if keyword.ends_with("keyframes") {
                    let body = self.block();
                    let frames = parse_stylesheet(body)
                        .rules
                        .into_iter()
                        .filter_map(|rule| match rule {
                            CssRule::Style(frame) => Some(frame),
                            _ => None,
                        })
                        .collect();
                    Some(CssRule::Keyframes(KeyframesRule {
                        keyword,
                        name: prelude,
                        frames,
                    }))
                } else if CONDITIONAL_AT_RULES.contains(&keyword.as_str()) {
                    self.pos += 1;
                    let rules = self.rules(true);
                    Some(CssRule::Conditional(ConditionalRule {
                        keyword,
                        condition: prelude,
                        rules,
                    }))
                } else {
                    let block = collapse_whitespace(self.block().trim());
                    Some(CssRule::Other(OtherAtRule {
                        keyword,
                        prelude,
                        block: Some(block),
                    }))
                }
            }
            Some(';') => {
                self.pos += 1;
                Some(CssRule::Other(OtherAtRule {
                    keyword,
                    prelude,
                    block: None,
                }))
            }
            Some(c) => {
                if c != '}' {
                    self.pos += c.len_utf8();
                }
                self.errors.push(format!("malformed @{keyword} rule"));
                None
            }
            None => {
                self.errors.push(format!("unterminated @{keyword} rule"));
                None
            }
        }
    }
}
