//! Selector matching for tree-shaking
//!
//! Supports type, universal, class, ID and attribute-presence selectors
//! joined by descendant, child and sibling combinators. Pseudo-classes and
//! pseudo-elements are ignored (they are assumed to match at some point),
//! so the test over-approximates: a rule is only ever dropped when no
//! element could match it. Selectors the parser does not understand are
//! treated as used.

use std::collections::HashSet;

use crate::dom::{Document, NodeId, NodeData};

/// Class prefixes added by the AMP runtime after load.
const DYNAMIC_CLASS_PREFIXES: &[&str] = &["i-amphtml-", "amp-"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<String>,
    /// Carries `:root`.
    pub root: bool,
}

impl Compound {
    fn is_root_only(&self) -> bool {
        self.root && self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty()
            && self.attributes.is_empty()
    }
}

/// A parsed complex selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Selector {
    /// Parse one complex selector; `None` when it uses unsupported syntax.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        SelectorParser::new(text).parse()
    }

    /// Rightmost compound, the one an element must match itself.
    #[must_use]
    pub fn subject(&self) -> &Compound {
        // Invariant: a parsed selector has at least one compound.
        &self.compounds[self.compounds.len() - 1]
    }

    #[must_use]
    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        self.matches_at(document, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, document: &Document, node: NodeId, index: usize) -> bool {
        if !compound_matches(document, node, &self.compounds[index]) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let previous = index - 1;
        match self.combinators[previous] {
            Combinator::Child => document
                .parent(node)
                .is_some_and(|parent| self.matches_at(document, parent, previous)),
            Combinator::Descendant => document
                .ancestors(node)
                .into_iter()
                .any(|ancestor| self.matches_at(document, ancestor, previous)),
            Combinator::Adjacent => document
                .previous_element_siblings(node)
                .first()
                .is_some_and(|sibling| self.matches_at(document, *sibling, previous)),
            Combinator::Sibling => document
                .previous_element_siblings(node)
                .into_iter()
                .any(|sibling| self.matches_at(document, sibling, previous)),
        }
    }
}

fn compound_matches(document: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(data) = document.data(node) else {
        return false;
    };
    let element = match data {
        NodeData::Element(element) => element,
        NodeData::Document | NodeData::Fragment => return compound.is_root_only(),
        _ => return false,
    };
    if compound.root && element.name() != "html" && !compound.is_root_only() {
        return false;
    }
    if compound.is_root_only() {
        return element.name() == "html";
    }
    compound.tag.as_deref().is_none_or(|tag| element.name() == tag)
        && compound.ids.iter().all(|id| element.id() == Some(id.as_str()))
        && compound
            .classes
            .iter()
            .all(|class| is_dynamic_class(class) || element.has_class(class))
        && compound.attributes.iter().all(|attr| element.has_attr(attr))
}

fn is_dynamic_class(class: &str) -> bool {
    DYNAMIC_CLASS_PREFIXES
        .iter()
        .any(|prefix| class.starts_with(prefix) && !class.starts_with(crate::utils::INLINE_STYLE_CLASS_PREFIX))
}

struct SelectorParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> SelectorParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.trim().chars().peekable(),
        }
    }

    fn parse(mut self) -> Option<Selector> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut current = Compound::default();
        let mut started = false;
        let mut pending: Option<Combinator> = None;

        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '>' | '+' | '~') {
                self.chars.next();
                let combinator = match c {
                    '>' => Combinator::Child,
                    '+' => Combinator::Adjacent,
                    '~' => Combinator::Sibling,
                    _ => Combinator::Descendant,
                };
                if !started && pending.is_none() {
                    // Leading combinator.
                    return None;
                }
                if started {
                    compounds.push(std::mem::take(&mut current));
                    started = false;
                    pending = Some(combinator);
                } else if combinator != Combinator::Descendant {
                    // `a > b`: the explicit combinator replaces the whitespace.
                    if pending.is_some_and(|p| p != Combinator::Descendant) {
                        return None;
                    }
                    pending = Some(combinator);
                }
                continue;
            }

            if let Some(combinator) = pending.take() {
                combinators.push(combinator);
            }
            started = true;
            match c {
                '*' => {
                    self.chars.next();
                }
                '.' => {
                    self.chars.next();
                    current.classes.push(self.ident()?);
                }
                '#' => {
                    self.chars.next();
                    current.ids.push(self.ident()?);
                }
                '[' => {
                    self.chars.next();
                    current.attributes.push(self.attribute()?);
                }
                ':' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&':') {
                        self.chars.next();
                    }
                    let name = self.ident()?.to_ascii_lowercase();
                    if name == "root" {
                        current.root = true;
                    }
                    if self.chars.peek() == Some(&'(') {
                        self.skip_parenthesized()?;
                    }
                }
                c if is_ident_start(c) => {
                    if current.tag.is_some() {
                        return None;
                    }
                    current.tag = Some(self.ident()?.to_ascii_lowercase());
                }
                _ => return None,
            }
        }

        if pending.is_some() || !started {
            return None;
        }
        compounds.push(current);
        Some(Selector {
            compounds,
            combinators,
        })
    }

    fn ident(&mut self) -> Option<String> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                self.chars.next();
                ident.push(self.chars.next()?);
            } else if is_ident_char(c) {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        (!ident.is_empty()).then_some(ident)
    }

    /// Name of an attribute selector; the value test is ignored.
    fn attribute(&mut self) -> Option<String> {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
        let name = self.ident()?.to_ascii_lowercase();
        let mut quote: Option<char> = None;
        loop {
            let c = self.chars.next()?;
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == ']' => return Some(name),
                None => {}
            }
        }
    }

    fn skip_parenthesized(&mut self) -> Option<()> {
        let mut depth = 0usize;
        loop {
            match self.chars.next()? {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(());
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// Tokens present in the live tree, used to reject selectors before any
/// tree walking.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    elements: Vec<NodeId>,
    tags: HashSet<String>,
    classes: HashSet<String>,
    ids: HashSet<String>,
    attributes: HashSet<String>,
}

impl DocumentIndex {
    #[must_use]
    pub fn build(document: &Document) -> Self {
        let mut index = Self {
            elements: document.descendant_elements(),
            ..Self::default()
        };
        for node in &index.elements {
            let Some(element) = document.element(*node) else {
                continue;
            };
            index.tags.insert(element.name().to_string());
            index
                .classes
                .extend(element.classes().map(str::to_string));
            if let Some(id) = element.id() {
                index.ids.insert(id.to_string());
            }
            index
                .attributes
                .extend(element.attrs().iter().map(|attr| attr.name.clone()));
        }
        index
    }

    fn may_match(&self, selector: &Selector) -> bool {
        selector.compounds.iter().all(|compound| {
            compound.tag.as_ref().is_none_or(|tag| self.tags.contains(tag))
                && compound
                    .classes
                    .iter()
                    .all(|class| is_dynamic_class(class) || self.classes.contains(class))
                && compound.ids.iter().all(|id| self.ids.contains(id))
                && compound
                    .attributes
                    .iter()
                    .all(|attr| self.attributes.contains(attr))
        })
    }

    /// Whether any live element matches `selector`.
    #[must_use]
    pub fn is_used(&self, document: &Document, selector: &Selector) -> bool {
        if !self.may_match(selector) {
            return false;
        }
        self.elements
            .iter()
            .any(|node| selector.matches(document, *node))
    }

    /// Usage test on selector text. Unparsable selectors count as used.
    #[must_use]
    pub fn is_selector_text_used(&self, document: &Document, text: &str) -> bool {
        match Selector::parse(text) {
            Some(selector) => self.is_used(document, &selector),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used(html: &str, selector: &str) -> bool {
        let doc = Document::parse_fragment(html);
        DocumentIndex::build(&doc).is_selector_text_used(&doc, selector)
    }

    #[test]
    fn test_parse_compounds() {
        let selector = Selector::parse("div.a.b#main[data-x] > span").expect("valid");
        assert_eq!(selector.compounds.len(), 2);
        assert_eq!(selector.combinators, vec![Combinator::Child]);
        assert_eq!(selector.compounds[0].classes, vec!["a", "b"]);
        assert_eq!(selector.compounds[0].attributes, vec!["data-x"]);
        assert_eq!(selector.subject().tag.as_deref(), Some("span"));
        assert!(Selector::parse("> a").is_none());
        assert!(Selector::parse("a >").is_none());
        assert!(Selector::parse("a & b").is_none());
    }

    #[test]
    fn test_basic_matching() {
        let html = r#"<div id="main" class="box"><p class="lead"><span>x</span></p></div>"#;
        assert!(used(html, "div"));
        assert!(used(html, ".lead"));
        assert!(used(html, "#main .lead span"));
        assert!(used(html, "div > p > span"));
        assert!(used(html, "p:hover span::after"));
        assert!(used(html, "[class]"));
        assert!(used(html, "[id=\"other\"]"));
        assert!(!used(html, "div > span"));
        assert!(!used(html, ".missing"));
        assert!(!used(html, "section p"));
        assert!(!used(html, "[title]"));
    }

    #[test]
    fn test_sibling_combinators() {
        let html = "<h2>a</h2><p>b</p><ul><li>c</li></ul>";
        assert!(used(html, "h2 + p"));
        assert!(used(html, "h2 ~ ul"));
        assert!(!used(html, "h2 + ul"));
        assert!(!used(html, "ul ~ h2"));
    }

    #[test]
    fn test_root_prefix_matches_fragment_children() {
        let html = r#"<span class="amp-wp-1234567">x</span>"#;
        assert!(used(
            html,
            ":root:not(#_):not(#_):not(#_):not(#_):not(#_) .amp-wp-1234567"
        ));
        assert!(!used(
            html,
            ":root:not(#_):not(#_):not(#_):not(#_):not(#_) .amp-wp-7654321"
        ));
    }

    #[test]
    fn test_dynamic_and_unparsable_selectors_are_kept() {
        assert!(used("<div></div>", "div.amp-active"));
        assert!(used("<div></div>", "div ^ weird"));
    }

    #[test]
    fn test_escaped_class_names() {
        assert!(used(r#"<div class="md:flex"></div>"#, r".md\:flex"));
    }
}
