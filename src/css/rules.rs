//! Parsed stylesheet model and its minified serialization

use serde::{Deserialize, Serialize};

use super::declarations::{Declaration, serialize_declarations};

/// Rule list of one style source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStylesheet {
    pub rules: Vec<CssRule>,
    /// Fragments the parser had to skip.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CssRule {
    Style(StyleRule),
    Keyframes(KeyframesRule),
    /// `@media` / `@supports` with nested rules.
    Conditional(ConditionalRule),
    /// Any other at-rule, kept verbatim (`@font-face`, `@import`, `@page`...).
    Other(OtherAtRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframesRule {
    /// At-keyword including vendor prefix, e.g. `-webkit-keyframes`.
    pub keyword: String,
    pub name: String,
    pub frames: Vec<StyleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub keyword: String,
    pub condition: String,
    pub rules: Vec<CssRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAtRule {
    pub keyword: String,
    pub prelude: String,
    /// Raw block content, `None` for statement at-rules.
    pub block: Option<String>,
}

impl StyleRule {
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "{}{{{}}}",
            self.selectors.join(","),
            serialize_declarations(&self.declarations)
        )
    }
}

impl KeyframesRule {
    #[must_use]
    pub fn to_css(&self) -> String {
        let frames: String = self.frames.iter().map(StyleRule::to_css).collect();
        format!("@{} {}{{{frames}}}", self.keyword, self.name)
    }

    /// Every property used by any frame.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.frames
            .iter()
            .flat_map(|frame| frame.declarations.iter())
            .map(|d| d.property.as_str())
    }
}

impl ConditionalRule {
    #[must_use]
    pub fn to_css(&self) -> String {
        let nested: String = self.rules.iter().map(CssRule::to_css).collect();
        if self.condition.is_empty() {
            format!("@{}{{{nested}}}", self.keyword)
        } else {
            format!("@{} {}{{{nested}}}", self.keyword, self.condition)
        }
    }
}

impl OtherAtRule {
    #[must_use]
    pub fn to_css(&self) -> String {
        let head = if self.prelude.is_empty() {
            format!("@{}", self.keyword)
        } else {
            format!("@{} {}", self.keyword, self.prelude)
        };
        match &self.block {
            Some(block) => format!("{head}{{{block}}}"),
            None => format!("{head};"),
        }
    }
}

impl CssRule {
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            CssRule::Style(rule) => rule.to_css(),
            CssRule::Keyframes(rule) => rule.to_css(),
            CssRule::Conditional(rule) => rule.to_css(),
            CssRule::Other(rule) => rule.to_css(),
        }
    }

    /// Short label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            CssRule::Style(rule) => rule.selectors.join(","),
            CssRule::Keyframes(rule) => format!("@{} {}", rule.keyword, rule.name),
            CssRule::Conditional(rule) => format!("@{} {}", rule.keyword, rule.condition),
            CssRule::Other(rule) => format!("@{}", rule.keyword),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minified_output() {
        let rule = CssRule::Conditional(ConditionalRule {
            keyword: "media".into(),
            condition: "screen".into(),
            rules: vec![CssRule::Style(StyleRule {
                selectors: vec!["a".into(), ".b".into()],
                declarations: vec![Declaration::new("color", "red")],
            })],
        });
        assert_eq!(rule.to_css(), "@media screen{a,.b{color:red}}");

        let import = CssRule::Other(OtherAtRule {
            keyword: "import".into(),
            prelude: "url(x.css)".into(),
            block: None,
        });
        assert_eq!(import.to_css(), "@import url(x.css);");
    }
}
