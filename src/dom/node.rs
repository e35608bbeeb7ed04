//! Node payloads stored in the document arena.

use serde::{Deserialize, Serialize};

/// Value stored at every arena slot of a [`Document`](super::Document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Root of a full document (`<!DOCTYPE>` + `<html>`).
    Document,
    /// Root of a fragment (body content only).
    Fragment,
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

impl NodeData {
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, NodeData::Document | NodeData::Fragment)
    }

    /// Whether this kind of node may carry children.
    #[must_use]
    pub fn can_have_children(&self) -> bool {
        matches!(
            self,
            NodeData::Document | NodeData::Fragment | NodeData::Element(_)
        )
    }
}

/// A single attribute, kept in source order on its element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An HTML element with an ordered attribute list.
///
/// Names are stored lowercase. Attribute lookups are exact-match on the
/// lowercase name, which is what the HTML parser produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Build an element with attributes, keeping the first occurrence of a
    /// duplicated attribute name like the HTML tokenizer does.
    pub fn with_attrs<I, K, V>(name: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut element = Self::new(name);
        for (key, value) in attrs {
            let key = key.into().to_ascii_lowercase();
            if !element.has_attr(&key) {
                element.attrs.push(Attribute {
                    name: key,
                    value: value.into(),
                });
            }
        }
        element
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|attr| attr.name == name)
    }

    /// Set an attribute value, replacing it in place when it already exists
    /// so that attribute order stays stable across runs.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_ascii_lowercase(),
                value,
            }),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|attr| attr.name == name)?;
        Some(self.attrs.remove(index).value)
    }

    /// Whitespace-separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Append a class token unless it is already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let updated = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {class}", existing.trim())
            }
            _ => class.to_string(),
        };
        self.set_attr("class", updated);
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_keeps_position() {
        let mut el = Element::with_attrs("div", [("id", "a"), ("class", "b"), ("title", "c")]);
        el.set_attr("class", "z");
        let names: Vec<_> = el.attrs().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "class", "title"]);
        assert_eq!(el.attr("class"), Some("z"));
    }

    #[test]
    fn test_duplicate_attrs_keep_first() {
        let el = Element::with_attrs("p", [("id", "first"), ("ID", "second")]);
        assert_eq!(el.attrs().len(), 1);
        assert_eq!(el.id(), Some("first"));
    }

    #[test]
    fn test_add_class() {
        let mut el = Element::with_attrs("span", [("class", " one ")]);
        el.add_class("two");
        el.add_class("one");
        assert_eq!(el.attr("class"), Some("one two"));
        assert!(el.has_class("two"));
    }
}
