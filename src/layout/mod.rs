//! Layout resolution for AMP components
//!
//! Every layout-capable element must carry a `layout` attribute and the
//! dimensions that layout needs. [`resolve`] derives them, in order of
//! preference, from:
//! 1. a `data-amp-layout` hint left by a converter,
//! 2. an explicit, valid `layout` attribute (kept as-is),
//! 3. `width`/`height` attributes and percentage sizing in inline style,
//! 4. the rule's fallback dimensions or the largest child.
//!
//! The resolver only computes a [`LayoutDecision`]; the validator decides
//! whether and when to apply it.

mod dimension;
mod mode;

pub use dimension::{Dimension, format_number};
pub use mode::LayoutMode;

use tracing::trace;

use crate::css::{Declaration, parse_declarations, serialize_declarations};
use crate::dom::{Document, Element, NodeId};
use crate::spec::{LayoutDefaults, SpecRule};
use crate::utils::{FALLBACK_HEIGHT, LAYOUT_HINT_ATTRIBUTE};

/// Change to one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPatch {
    Keep,
    Set(String),
    Remove,
}

impl AttrPatch {
    fn apply(&self, element: &mut Element, name: &str) {
        match self {
            AttrPatch::Keep => {}
            AttrPatch::Set(value) => element.set_attr(name, value.clone()),
            AttrPatch::Remove => {
                element.remove_attr(name);
            }
        }
    }
}

/// Where the resolved layout came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSource {
    Hint,
    Explicit,
    Dimensions,
    InlineStyle,
    Fallback,
    Children,
}

/// Resolved layout and the attribute changes that realize it
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDecision {
    pub mode: LayoutMode,
    pub source: LayoutSource,
    pub width: AttrPatch,
    pub height: AttrPatch,
    /// Inline style with the consumed sizing declarations removed.
    pub style_patch: AttrPatch,
    /// A `layout` value that was present but not valid for the element.
    pub invalid_layout: Option<String>,
}

impl LayoutDecision {
    fn new(mode: LayoutMode, source: LayoutSource) -> Self {
        Self {
            mode,
            source,
            width: AttrPatch::Keep,
            height: AttrPatch::Keep,
            style_patch: AttrPatch::Keep,
            invalid_layout: None,
        }
    }

    /// Write the decision onto the element.
    pub fn apply(&self, element: &mut Element) {
        element.remove_attr(LAYOUT_HINT_ATTRIBUTE);
        self.width.apply(element, "width");
        self.height.apply(element, "height");
        self.style_patch.apply(element, "style");
        element.set_attr("layout", self.mode.as_str());
    }
}

/// Compute the layout of `node` under `rule`. Returns `None` for elements
/// that take no part in AMP layout.
#[must_use]
pub fn resolve(document: &Document, node: NodeId, rule: &SpecRule) -> Option<LayoutDecision> {
    let defaults = rule.layout.as_ref()?;
    let element = document.element(node)?;

    if let Some(mode) = element
        .attr(LAYOUT_HINT_ATTRIBUTE)
        .and_then(|hint| hint.parse::<LayoutMode>().ok())
        .filter(|mode| defaults.allows(*mode))
    {
        let mut decision = LayoutDecision::new(mode, LayoutSource::Hint);
        if mode == LayoutMode::Fill {
            decision.width = remove_if_present(element, "width");
            decision.height = remove_if_present(element, "height");
        }
        return Some(decision);
    }

    let mut invalid_layout = None;
    if let Some(raw) = element.attr("layout") {
        match raw.parse::<LayoutMode>() {
            Ok(mode) if defaults.allows(mode) => {
                return Some(LayoutDecision::new(mode, LayoutSource::Explicit));
            }
            _ => invalid_layout = Some(raw.to_string()),
        }
    }

    let mut decision = infer(document, node, element, defaults);
    decision.invalid_layout = invalid_layout;
    trace!(
        tag = element.name(),
        layout = decision.mode.as_str(),
        source = ?decision.source,
        "layout inferred"
    );
    Some(decision)
}

/// Percentages other than 100% cannot be expressed by any layout and are
/// treated as unset.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Size {
    Unset,
    Full,
    Auto,
    Pixels(f64),
}

impl Size {
    fn from_value(value: Option<&str>) -> Self {
        match value.and_then(Dimension::parse) {
            Some(d) if d.is_full() => Size::Full,
            Some(Dimension::Auto) => Size::Auto,
            Some(Dimension::Pixels(px)) => Size::Pixels(px),
            _ => Size::Unset,
        }
    }
}

fn infer(
    document: &Document,
    node: NodeId,
    element: &Element,
    defaults: &LayoutDefaults,
) -> LayoutDecision {
    let style = element.attr("style").map(parse_declarations).unwrap_or_default();

    if let Some(remaining) = strip_fill_pattern(&style) {
        let mut decision = LayoutDecision::new(LayoutMode::Fill, LayoutSource::InlineStyle);
        decision.width = remove_if_present(element, "width");
        decision.height = remove_if_present(element, "height");
        decision.style_patch = style_patch(&remaining);
        return constrain(decision, defaults);
    }

    // Percentage sizing in inline style stands in for missing attributes.
    let mut consumed = Vec::new();
    let mut size_of = |name: &str| -> Size {
        let from_attr = Size::from_value(element.attr(name));
        if from_attr != Size::Unset || element.has_attr(name) {
            return from_attr;
        }
        match style.iter().position(|d| d.property == name) {
            Some(index) if Size::from_value(Some(style[index].value.as_str())) == Size::Full => {
                consumed.push(index);
                Size::Full
            }
            _ => Size::Unset,
        }
    };
    let width = size_of("width");
    let height = size_of("height");
    let source = if consumed.is_empty() {
        LayoutSource::Dimensions
    } else {
        LayoutSource::InlineStyle
    };

    let mut decision = match (width, height) {
        (Size::Full, Size::Full) => {
            let mut d = LayoutDecision::new(LayoutMode::Fill, source);
            d.width = remove_if_present(element, "width");
            d.height = remove_if_present(element, "height");
            d
        }
        (Size::Full | Size::Auto | Size::Unset, Size::Pixels(h)) => {
            fixed_height(element, source, format_number(h))
        }
        (Size::Pixels(w), Size::Pixels(h)) => {
            let mut d = LayoutDecision::new(defaults.dimensioned_layout, source);
            d.width = set_if_changed(element, "width", format_number(w));
            d.height = set_if_changed(element, "height", format_number(h));
            d
        }
        // A concrete width is kept; the full height becomes the fallback.
        (Size::Pixels(w), Size::Full) => {
            let height = defaults.fallback_height.unwrap_or(FALLBACK_HEIGHT);
            let mut d = LayoutDecision::new(LayoutMode::Fixed, source);
            d.width = set_if_changed(element, "width", format_number(w));
            d.height = set_if_changed(element, "height", height.to_string());
            d
        }
        (Size::Unset, Size::Unset) => from_fallback(document, node, element, defaults),
        // No usable height.
        _ => fixed_height(
            element,
            source,
            format_number(f64::from(defaults.fallback_height.unwrap_or(FALLBACK_HEIGHT))),
        ),
    };

    if !consumed.is_empty() {
        let remaining: Vec<Declaration> = style
            .iter()
            .enumerate()
            .filter(|(index, _)| !consumed.contains(index))
            .map(|(_, d)| d.clone())
            .collect();
        decision.style_patch = style_patch(&remaining);
    }
    constrain(decision, defaults)
}

fn fixed_height(element: &Element, source: LayoutSource, height: String) -> LayoutDecision {
    let mut decision = LayoutDecision::new(LayoutMode::FixedHeight, source);
    decision.width = set_if_changed(element, "width", "auto".to_string());
    decision.height = set_if_changed(element, "height", height);
    decision
}

fn from_fallback(
    document: &Document,
    node: NodeId,
    element: &Element,
    defaults: &LayoutDefaults,
) -> LayoutDecision {
    if defaults.aggregate_children {
        if let Some((w, h)) = largest_child(document, node) {
            let mut decision =
                LayoutDecision::new(defaults.dimensioned_layout, LayoutSource::Children);
            decision.width = set_if_changed(element, "width", format_number(w));
            decision.height = set_if_changed(element, "height", format_number(h));
            return decision;
        }
    }

    match (defaults.fallback_width, defaults.fallback_height) {
        (Some(w), Some(h)) => {
            let mut decision =
                LayoutDecision::new(defaults.dimensioned_layout, LayoutSource::Fallback);
            decision.width = set_if_changed(element, "width", w.to_string());
            decision.height = set_if_changed(element, "height", h.to_string());
            decision
        }
        (None, Some(h)) => fixed_height(element, LayoutSource::Fallback, h.to_string()),
        _ => {
            let mut decision = LayoutDecision::new(LayoutMode::Fill, LayoutSource::Fallback);
            decision.width = remove_if_present(element, "width");
            decision.height = remove_if_present(element, "height");
            decision
        }
    }
}

/// Width and height of the element child with the largest area. Children
/// without a positive height are ignored.
fn largest_child(document: &Document, node: NodeId) -> Option<(f64, f64)> {
    document
        .element_children(node)
        .into_iter()
        .filter_map(|child| {
            let element = document.element(child)?;
            let w = element.attr("width").and_then(Dimension::parse)?.pixels()?;
            let h = element.attr("height").and_then(Dimension::parse)?.pixels()?;
            (h > 0.0).then_some((w, h))
        })
        .fold(None, |best: Option<(f64, f64)>, (w, h)| match best {
            Some((bw, bh)) if bw * bh >= w * h => Some((bw, bh)),
            _ => Some((w, h)),
        })
}

/// Fall back to the first allowed layout when the inferred one is not
/// allowed for the element.
fn constrain(mut decision: LayoutDecision, defaults: &LayoutDefaults) -> LayoutDecision {
    if !defaults.allows(decision.mode) {
        if let Some(first) = defaults.allowed_layouts.first() {
            decision.mode = *first;
        }
    }
    decision
}

/// Detect the inline-style "fill the parent" idioms and return the
/// declarations that remain once they are removed:
/// - `width:100%; height:100%`
/// - `position:absolute; top:0; left:0; right:0; bottom:0`
fn strip_fill_pattern(style: &[Declaration]) -> Option<Vec<Declaration>> {
    let find = |name: &str| style.iter().find(|d| d.property == name);
    let full = |name: &str| find(name).is_some_and(|d| Size::from_value(Some(d.value.as_str())) == Size::Full);
    let zero = |name: &str| find(name).is_some_and(Declaration::is_zero);

    let full_size = full("width") && full("height");
    let pinned = find("position").is_some_and(|d| d.value_is("absolute"))
        && zero("top")
        && zero("left")
        && zero("right")
        && zero("bottom");

    let consumed: &[&str] = if pinned {
        &["position", "top", "left", "right", "bottom", "width", "height"]
    } else if full_size {
        &["width", "height"]
    } else {
        return None;
    };

    Some(
        style
            .iter()
            .filter(|d| {
                if !consumed.contains(&d.property.as_str()) {
                    return true;
                }
                // In the pinned idiom only 100% sizes are part of the pattern.
                (d.property == "width" || d.property == "height")
                    && Size::from_value(Some(d.value.as_str())) != Size::Full
            })
            .cloned()
            .collect(),
    )
}

fn style_patch(remaining: &[Declaration]) -> AttrPatch {
    if remaining.is_empty() {
        AttrPatch::Remove
    } else {
        AttrPatch::Set(serialize_declarations(remaining))
    }
}

fn remove_if_present(element: &Element, name: &str) -> AttrPatch {
    if element.has_attr(name) {
        AttrPatch::Remove
    } else {
        AttrPatch::Keep
    }
}

fn set_if_changed(element: &Element, name: &str, value: String) -> AttrPatch {
    if element.attr(name) == Some(value.as_str()) {
        AttrPatch::Keep
    } else {
        AttrPatch::Set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecTable;

    fn decide(html: &str) -> (Document, NodeId, Option<LayoutDecision>) {
        let doc = Document::parse_fragment(html);
        let node = doc.descendant_elements()[0];
        let element = doc.element(node).expect("element").clone();
        let rule = SpecTable::builtin().lookup(&element).into_owned();
        let decision = resolve(&doc, node, &rule);
        (doc, node, decision)
    }

    fn applied(html: &str) -> String {
        let (mut doc, node, decision) = decide(html);
        let decision = decision.expect("layout element");
        doc.update_element(node, |el| decision.apply(el));
        doc.outer_html(node)
    }

    #[test]
    fn test_full_width_and_height_is_fill() {
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" width="100%" height="100%"></amp-img>"#),
            r#"<amp-img src="a.jpg" layout="fill"></amp-img>"#
        );
    }

    #[test]
    fn test_full_width_is_fixed_height() {
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" width="100%" height="10"></amp-img>"#),
            r#"<amp-img src="a.jpg" width="auto" height="10" layout="fixed-height"></amp-img>"#
        );
    }

    #[test]
    fn test_full_height_keeps_concrete_width() {
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" width="300" height="100%"></amp-img>"#),
            r#"<amp-img src="a.jpg" width="300" height="400" layout="fixed"></amp-img>"#
        );
        assert_eq!(
            applied(r#"<amp-audio src="https://example.com/a.mp3" width="120" style="height:100%"></amp-audio>"#),
            r#"<amp-audio src="https://example.com/a.mp3" width="120" height="50" layout="fixed"></amp-audio>"#
        );
    }

    #[test]
    fn test_numeric_dimensions_use_rule_default() {
        let (_, _, decision) =
            decide(r#"<amp-img src="a.jpg" width="300px" height="200"></amp-img>"#);
        let decision = decision.expect("layout element");
        assert_eq!(decision.mode, LayoutMode::Responsive);
        assert_eq!(decision.width, AttrPatch::Set("300".into()));
        assert_eq!(decision.height, AttrPatch::Keep);
    }

    #[test]
    fn test_explicit_layout_is_kept() {
        let (_, _, decision) =
            decide(r#"<amp-img src="a.jpg" layout="fixed" width="1" height="1"></amp-img>"#);
        let decision = decision.expect("layout element");
        assert_eq!(decision.source, LayoutSource::Explicit);
        assert_eq!(decision.mode, LayoutMode::Fixed);
    }

    #[test]
    fn test_invalid_layout_falls_back_to_inference() {
        let (_, _, decision) =
            decide(r#"<amp-img src="a.jpg" layout="sideways" width="100%" height="100%"></amp-img>"#);
        let decision = decision.expect("layout element");
        assert_eq!(decision.invalid_layout.as_deref(), Some("sideways"));
        assert_eq!(decision.mode, LayoutMode::Fill);
    }

    #[test]
    fn test_hint_is_preferred_and_removed() {
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" data-amp-layout="fill" width="10" height="10" layout="fixed"></amp-img>"#),
            r#"<amp-img src="a.jpg" layout="fill"></amp-img>"#
        );
    }

    #[test]
    fn test_inline_fill_pattern_keeps_unrelated_declarations() {
        assert_eq!(
            applied(
                r#"<amp-img src="a.jpg" style="position:absolute;top:0;left:0;right:0;bottom:0;color:red"></amp-img>"#
            ),
            r#"<amp-img src="a.jpg" style="color:red" layout="fill"></amp-img>"#
        );
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" style="width:100%;height:100%"></amp-img>"#),
            r#"<amp-img src="a.jpg" layout="fill"></amp-img>"#
        );
    }

    #[test]
    fn test_missing_height_uses_fallback() {
        assert_eq!(
            applied(r#"<amp-img src="a.jpg" width="300"></amp-img>"#),
            r#"<amp-img src="a.jpg" width="auto" height="400" layout="fixed-height"></amp-img>"#
        );
    }

    #[test]
    fn test_rule_fallback_dimensions() {
        assert_eq!(
            applied(r#"<amp-youtube data-videoid="x"></amp-youtube>"#),
            r#"<amp-youtube data-videoid="x" width="480" height="270" layout="responsive"></amp-youtube>"#
        );
    }

    #[test]
    fn test_children_aggregate_picks_largest_area() {
        let html = r#"<amp-carousel><amp-img src="a" width="100" height="50"></amp-img><amp-img src="b" width="300" height="0"></amp-img><amp-img src="c" width="80" height="80"></amp-img></amp-carousel>"#;
        let (_, _, decision) = decide(html);
        let decision = decision.expect("layout element");
        assert_eq!(decision.source, LayoutSource::Children);
        assert_eq!(decision.width, AttrPatch::Set("80".into()));
        assert_eq!(decision.height, AttrPatch::Set("80".into()));
    }

    #[test]
    fn test_non_layout_element() {
        let (_, _, decision) = decide("<div style=\"width:100%\"></div>");
        assert!(decision.is_none());
    }
}
