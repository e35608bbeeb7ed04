//! Spec table: which tags and attributes are allowed, and how
//!
//! The table is immutable, built once per process and handed to the
//! validator by reference. Several rules may exist for one tag; they are
//! tried in insertion order and the first whose discriminators match wins.
//! Tags without a matching rule resolve to a deny-all rule.

mod builtin;
mod types;

pub use types::{
    AttributeConstraint, Discriminator, Disallowed, LayoutDefaults, Recovery,
    RequiredCombination, SpecRule,
};

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::dom::Element;

/// Collection of [`SpecRule`]s keyed by tag name
#[derive(Debug, Clone)]
pub struct SpecTable {
    rules: HashMap<String, Vec<SpecRule>>,
    global_attributes: Vec<(String, AttributeConstraint)>,
    global_prefixes: Vec<String>,
    layout_attributes: Vec<String>,
    unwrap_tags: HashSet<String>,
    dimension: AttributeConstraint,
    any: AttributeConstraint,
}

impl Default for SpecTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecTable {
    /// Empty table that denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            global_attributes: Vec::new(),
            global_prefixes: Vec::new(),
            layout_attributes: Vec::new(),
            unwrap_tags: HashSet::new(),
            dimension: AttributeConstraint::Any,
            any: AttributeConstraint::Any,
        }
    }

    /// The process-wide builtin AMP table.
    #[must_use]
    pub fn builtin() -> &'static SpecTable {
        &builtin::BUILTIN
    }

    pub fn insert(&mut self, rule: SpecRule) {
        self.rules.entry(rule.tag.clone()).or_default().push(rule);
    }

    pub fn set_globals(&mut self, attributes: &[&str], prefixes: &[&str], layout: &[&str]) {
        self.global_attributes = attributes
            .iter()
            .map(|name| ((*name).to_string(), AttributeConstraint::Any))
            .collect();
        self.global_prefixes = prefixes.iter().map(|p| (*p).to_string()).collect();
        self.layout_attributes = layout.iter().map(|name| (*name).to_string()).collect();
    }

    /// Add or replace the constraint of one global attribute.
    pub fn global_attribute(&mut self, name: &str, constraint: AttributeConstraint) {
        self.global_attributes.retain(|(attr, _)| attr != name);
        self.global_attributes.push((name.to_string(), constraint));
    }

    /// Constraint of `width`/`height` on layout-capable elements.
    pub fn set_dimension_constraint(&mut self, constraint: AttributeConstraint) {
        self.dimension = constraint;
    }

    pub fn set_unwrap_tags(&mut self, tags: &[&str]) {
        self.unwrap_tags = tags.iter().map(|tag| (*tag).to_string()).collect();
    }

    /// Resolve the rule for an element.
    ///
    /// Candidates for the tag are tried in priority order; when none matches
    /// the result is a deny-all rule whose disposition says whether the
    /// element is stripped or unwrapped.
    #[must_use]
    pub fn lookup(&self, element: &Element) -> Cow<'_, SpecRule> {
        let tag = element.name();
        if let Some(rule) = self
            .rules
            .get(tag)
            .and_then(|candidates| candidates.iter().find(|rule| rule.matches(element)))
        {
            return Cow::Borrowed(rule);
        }

        let disposition = if self.unwrap_tags.contains(tag) {
            Disallowed::Unwrap
        } else {
            Disallowed::Strip
        };
        Cow::Owned(SpecRule::deny_all(tag, disposition))
    }

    /// Constraint for `name` on elements governed by `rule`, or `None` when
    /// the attribute is not allowed at all.
    #[must_use]
    pub fn attribute_constraint<'a>(
        &'a self,
        rule: &'a SpecRule,
        name: &str,
    ) -> Option<&'a AttributeConstraint> {
        if !rule.is_allowed() {
            return None;
        }
        if let Some(constraint) = rule.constraint(name) {
            return Some(constraint);
        }
        if rule.layout.is_some() {
            if name == "width" || name == "height" {
                return Some(&self.dimension);
            }
            if self.layout_attributes.iter().any(|attr| attr == name) {
                return Some(&self.any);
            }
        }
        if !rule.allow_global_attributes {
            return None;
        }
        // Event handlers are never allowed; `on` itself is the AMP action
        // attribute and is listed explicitly.
        if name.starts_with("on") && name != "on" {
            return None;
        }
        if let Some((_, constraint)) = self.global_attributes.iter().find(|(attr, _)| attr == name)
        {
            return Some(constraint);
        }
        if self
            .global_prefixes
            .iter()
            .any(|prefix| name.len() > prefix.len() && name.starts_with(prefix.as_str()))
        {
            return Some(&self.any);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, attrs: &[(&str, &str)]) -> Element {
        Element::with_attrs(name, attrs.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_unknown_tag_is_denied() {
        let table = SpecTable::builtin();
        let rule = table.lookup(&element("blink-tag", &[]));
        assert!(!rule.is_allowed());
        assert_eq!(rule.disallowed, Some(Disallowed::Strip));
    }

    #[test]
    fn test_presentational_tags_unwrap() {
        let table = SpecTable::builtin();
        let rule = table.lookup(&element("font", &[("color", "red")]));
        assert_eq!(rule.disallowed, Some(Disallowed::Unwrap));
    }

    #[test]
    fn test_script_variants_resolve_by_discriminator() {
        let table = SpecTable::builtin();
        let ld = table.lookup(&element("script", &[("type", "application/ld+json")]));
        assert_eq!(ld.variant, "script[type=application/ld+json]");

        let ext = table.lookup(&element(
            "script",
            &[("custom-element", "amp-carousel"), ("src", "https://cdn.ampproject.org/v0/amp-carousel-0.1.js")],
        ));
        assert_eq!(ext.variant, "script[custom-element]");

        let inline = table.lookup(&element("script", &[]));
        assert!(!inline.is_allowed());
    }

    #[test]
    fn test_attribute_constraints() {
        let table = SpecTable::builtin();
        let a = table.lookup(&element("a", &[]));
        assert!(table.attribute_constraint(&a, "onclick").is_none());
        assert!(table.attribute_constraint(&a, "on").is_some());
        assert!(table.attribute_constraint(&a, "data-foo").is_some());
        assert!(table.attribute_constraint(&a, "data-").is_none());
        assert!(table.attribute_constraint(&a, "aria-label").is_some());
        assert!(table.attribute_constraint(&a, "bogus").is_none());

        let href = table.attribute_constraint(&a, "href").expect("href allowed");
        assert!(href.check("https://example.com/"));
        assert!(href.check("/relative"));
        assert!(!href.check("javascript:alert(1)"));
        assert!(!href.check("  JavaScript:alert(1)"));
    }

    #[test]
    fn test_layout_attributes_only_on_layout_elements() {
        let table = SpecTable::builtin();
        let img = table.lookup(&element("amp-img", &[]));
        assert!(table.attribute_constraint(&img, "layout").is_some());
        let width = table.attribute_constraint(&img, "width").expect("width allowed");
        assert!(width.check("100%"));
        assert!(width.check("auto"));
        assert!(width.check("300px"));
        assert!(!width.check("wide"));

        let div = table.lookup(&element("div", &[]));
        assert!(table.attribute_constraint(&div, "layout").is_none());
        assert!(table.attribute_constraint(&div, "width").is_none());
    }

    #[test]
    fn test_range_and_enum_constraints() {
        let range = AttributeConstraint::Range { min: 1.0, max: 10.0 };
        assert!(range.check("5"));
        assert!(!range.check("11"));
        assert!(!range.check("NaN"));
        let choice = AttributeConstraint::enumeration(&["get", "post"]);
        assert!(choice.check("POST"));
        assert!(!choice.check("put"));
    }
}
