//! Declarative rule types of the spec table

use fancy_regex::Regex;

use crate::dom::Element;
use crate::layout::LayoutMode;

/// Constraint on the value of an allowed attribute
#[derive(Debug, Clone)]
pub enum AttributeConstraint {
    /// Any value, including the empty string.
    Any,
    /// One of a fixed set of values, compared case-insensitively.
    Enum(Vec<String>),
    /// Value must match the pattern.
    Pattern(Regex),
    /// Numeric value within an inclusive range.
    Range { min: f64, max: f64 },
    /// Comma-separated image candidates, validated by the srcset grammar.
    Srcset,
}

impl AttributeConstraint {
    pub fn enumeration(values: &[&str]) -> Self {
        AttributeConstraint::Enum(values.iter().map(|v| (*v).to_string()).collect())
    }

    /// Check a value against the constraint. Srcset values always pass here;
    /// their grammar is checked by the validator.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        match self {
            AttributeConstraint::Any | AttributeConstraint::Srcset => true,
            AttributeConstraint::Enum(values) => {
                let value = value.trim();
                values.iter().any(|allowed| allowed.eq_ignore_ascii_case(value))
            }
            AttributeConstraint::Pattern(regex) => regex.is_match(value).unwrap_or(false),
            AttributeConstraint::Range { min, max } => value
                .trim()
                .parse::<f64>()
                .is_ok_and(|n| n.is_finite() && n >= *min && n <= *max),
        }
    }
}

/// Condition selecting one of several rules for the same tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    Always,
    AttrPresent(String),
    AttrAbsent(String),
    AttrEquals { name: String, value: String },
}

impl Discriminator {
    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Discriminator::Always => true,
            Discriminator::AttrPresent(name) => element.has_attr(name),
            Discriminator::AttrAbsent(name) => !element.has_attr(name),
            Discriminator::AttrEquals { name, value } => element
                .attr(name)
                .is_some_and(|actual| actual.trim().eq_ignore_ascii_case(value)),
        }
    }
}

/// What to do when a required attribute is missing and has no default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Set the default value declared by the combination.
    SynthesizeDefault,
    /// Remove the whole element.
    StripNode,
    /// Remove the triggering attributes.
    StripAttribute,
}

/// Attributes that must appear together
#[derive(Debug, Clone)]
pub struct RequiredCombination {
    /// Any of these being present activates the combination. Empty means
    /// the combination always applies.
    pub trigger: Vec<String>,
    pub requires: Vec<String>,
    /// Default values for required attributes, used before `recovery`.
    pub defaults: Vec<(String, String)>,
    pub recovery: Recovery,
}

impl RequiredCombination {
    #[must_use]
    pub fn is_triggered(&self, element: &Element) -> bool {
        self.trigger.is_empty() || self.trigger.iter().any(|name| element.has_attr(name))
    }

    #[must_use]
    pub fn default_for(&self, name: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Sizing defaults of elements taking part in AMP layout
#[derive(Debug, Clone)]
pub struct LayoutDefaults {
    pub fallback_width: Option<u32>,
    pub fallback_height: Option<u32>,
    pub allowed_layouts: Vec<LayoutMode>,
    /// Layout used when both dimensions are concrete numbers.
    pub dimensioned_layout: LayoutMode,
    /// Size from the largest child when the element has no sizing of its own.
    pub aggregate_children: bool,
}

impl LayoutDefaults {
    #[must_use]
    pub fn allows(&self, mode: LayoutMode) -> bool {
        self.allowed_layouts.contains(&mode)
    }
}

/// Disposition of tags no rule allows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disallowed {
    /// Remove the element and its subtree.
    Strip,
    /// Replace the element with its children.
    Unwrap,
}

/// Immutable validation rule for one (tag, variant) pair
#[derive(Debug, Clone)]
pub struct SpecRule {
    pub tag: String,
    /// Human readable variant name, e.g. `script[type=application/ld+json]`.
    pub variant: String,
    /// All must match for the rule to apply.
    pub discriminators: Vec<Discriminator>,
    pub allowed_attributes: Vec<(String, AttributeConstraint)>,
    pub allow_global_attributes: bool,
    /// Declaration order is priority order: the first present attribute of
    /// a group is kept.
    pub mutually_exclusive_groups: Vec<Vec<String>>,
    pub required_combinations: Vec<RequiredCombination>,
    pub layout: Option<LayoutDefaults>,
    pub components: Vec<String>,
    /// (attribute, component) pairs: the attribute's presence requires the
    /// component.
    pub attribute_components: Vec<(String, String)>,
    /// `None` for allowed rules; set on the deny-all fallback.
    pub disallowed: Option<Disallowed>,
}

impl SpecRule {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            variant: tag.to_string(),
            discriminators: Vec::new(),
            allowed_attributes: Vec::new(),
            allow_global_attributes: true,
            mutually_exclusive_groups: Vec::new(),
            required_combinations: Vec::new(),
            layout: None,
            components: Vec::new(),
            attribute_components: Vec::new(),
            disallowed: None,
        }
    }

    /// Implicit rule for unknown or disallowed tags.
    pub fn deny_all(tag: &str, disposition: Disallowed) -> Self {
        Self {
            allow_global_attributes: false,
            disallowed: Some(disposition),
            ..Self::new(tag)
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.disallowed.is_none()
    }

    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        self.discriminators.iter().all(|d| d.matches(element))
    }

    /// Constraint declared by this rule for `name`, not counting globals.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&AttributeConstraint> {
        self.allowed_attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, constraint)| constraint)
    }

    // Builder-style helpers used by the builtin table.

    #[must_use]
    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = variant.to_string();
        self
    }

    #[must_use]
    pub fn when(mut self, discriminator: Discriminator) -> Self {
        self.discriminators.push(discriminator);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str, constraint: AttributeConstraint) -> Self {
        self.allowed_attributes.push((name.to_string(), constraint));
        self
    }

    #[must_use]
    pub fn attrs(mut self, names: &[&str]) -> Self {
        for name in names {
            self.allowed_attributes
                .push(((*name).to_string(), AttributeConstraint::Any));
        }
        self
    }

    #[must_use]
    pub fn no_globals(mut self) -> Self {
        self.allow_global_attributes = false;
        self
    }

    #[must_use]
    pub fn exclusive(mut self, group: &[&str]) -> Self {
        self.mutually_exclusive_groups
            .push(group.iter().map(|name| (*name).to_string()).collect());
        self
    }

    #[must_use]
    pub fn requires(
        mut self,
        trigger: &[&str],
        requires: &[&str],
        defaults: &[(&str, &str)],
        recovery: Recovery,
    ) -> Self {
        self.required_combinations.push(RequiredCombination {
            trigger: trigger.iter().map(|name| (*name).to_string()).collect(),
            requires: requires.iter().map(|name| (*name).to_string()).collect(),
            defaults: defaults
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
            recovery,
        });
        self
    }

    #[must_use]
    pub fn layout(mut self, defaults: LayoutDefaults) -> Self {
        self.layout = Some(defaults);
        self
    }

    #[must_use]
    pub fn component(mut self, name: &str) -> Self {
        self.components.push(name.to_string());
        self
    }

    #[must_use]
    pub fn attribute_component(mut self, attribute: &str, component: &str) -> Self {
        self.attribute_components
            .push((attribute.to_string(), component.to_string()));
        self
    }
}
