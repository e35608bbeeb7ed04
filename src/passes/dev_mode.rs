//! Developer-mode exemption
//!
//! Elements carrying `data-ampdevmode` (and everything below them) are left
//! alone by the other passes. A marker on `<html>` therefore exempts the
//! whole document.

use tracing::debug;

use crate::css::Selector;
use crate::diagnostics::DiagnosticRecorder;
use crate::dom::{Document, NodeId};
use crate::pipeline::{PassOutput, PipelineResult, Sanitizer};
use crate::utils::DEV_MODE_ATTRIBUTE;

/// Whether the element itself carries the dev-mode marker.
#[must_use]
pub fn has_marker(document: &Document, node: NodeId) -> bool {
    document
        .element(node)
        .is_some_and(|element| element.has_attr(DEV_MODE_ATTRIBUTE))
}

/// Whether the node or one of its ancestors carries the marker.
#[must_use]
pub fn is_exempt(document: &Document, node: NodeId) -> bool {
    has_marker(document, node)
        || document
            .ancestors(node)
            .into_iter()
            .any(|ancestor| has_marker(document, ancestor))
}

/// The `dev-mode` pass: marks elements matching configured selectors
pub struct DevModeSanitizer {
    selectors: Vec<Selector>,
}

impl DevModeSanitizer {
    pub const NAME: &'static str = "dev-mode";

    /// Build from selector texts. Selectors that do not parse are skipped
    /// with a debug event.
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Self {
        let selectors = selectors
            .iter()
            .filter_map(|text| {
                let parsed = Selector::parse(text.as_ref());
                if parsed.is_none() {
                    debug!(selector = text.as_ref(), "ignoring unsupported dev-mode selector");
                }
                parsed
            })
            .collect();
        Self { selectors }
    }
}

impl Sanitizer for DevModeSanitizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sanitize(
        &mut self,
        document: &mut Document,
        _recorder: &mut DiagnosticRecorder<'_>,
    ) -> PipelineResult<PassOutput> {
        if self.selectors.is_empty() {
            return Ok(PassOutput::default());
        }

        let matched: Vec<NodeId> = document
            .descendant_elements()
            .into_iter()
            .filter(|node| {
                !has_marker(document, *node)
                    && self
                        .selectors
                        .iter()
                        .any(|selector| selector.matches(document, *node))
            })
            .collect();

        for node in &matched {
            document.update_element(*node, |el| el.set_attr(DEV_MODE_ATTRIBUTE, ""));
        }
        debug!(marked = matched.len(), "dev-mode markers applied");
        Ok(PassOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exemption_covers_subtree() {
        let doc = Document::parse_fragment(r#"<div data-ampdevmode><p><b>x</b></p></div><p>y</p>"#);
        let b = doc.first_element_by_tag("b").expect("b");
        assert!(is_exempt(&doc, b));
        assert!(!has_marker(&doc, b));
        let outside = doc.elements_by_tag("p")[1];
        assert!(!is_exempt(&doc, outside));
    }

    #[test]
    fn test_selectors_mark_elements() {
        let mut doc = Document::parse_fragment(r#"<div id="admin-bar"><a>x</a></div><p class="x">y</p>"#);
        let mut pass = DevModeSanitizer::new(&["#admin-bar", "p.x", "a & b"]);
        let mut recorder = DiagnosticRecorder::accept_all();
        pass.sanitize(&mut doc, &mut recorder).expect("dev-mode pass");
        assert_eq!(
            doc.to_html(),
            r#"<div id="admin-bar" data-ampdevmode><a>x</a></div><p class="x" data-ampdevmode>y</p>"#
        );
    }
}
