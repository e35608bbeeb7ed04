//! `<img>` to `<amp-img>` / `<amp-anim>` conversion

use std::sync::Arc;
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticRecorder};
use crate::dom::{Document, Element, NodeId};
use crate::layout::{Dimension, LayoutMode, format_number};
use crate::pipeline::{PassOutput, PipelineResult, Sanitizer};
use crate::utils::LAYOUT_HINT_ATTRIBUTE;
use crate::validator::srcset;

use super::dev_mode::is_exempt;

/// Attributes an `<img>` has that its AMP replacement must not carry.
const DROPPED_ATTRIBUTES: &[&str] = &["loading", "fetchpriority", "importance", "longdesc"];

/// Source of intrinsic image sizes, usually backed by the host's remote
/// image probing.
pub trait DimensionProvider: Send + Sync {
    /// `(width, height)` in CSS pixels, or `None` when unknown.
    fn dimensions(&self, url: &str) -> Option<(u32, u32)>;
}

/// The `img` pass
pub struct ImgSanitizer {
    provider: Option<Arc<dyn DimensionProvider>>,
    fallback_layout: Option<LayoutMode>,
}

impl ImgSanitizer {
    pub const NAME: &'static str = "img";

    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: None,
            fallback_layout: None,
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn DimensionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Layout used for images whose dimensions stay unknown.
    #[must_use]
    pub fn with_fallback_layout(mut self, layout: Option<LayoutMode>) -> Self {
        self.fallback_layout = layout;
        self
    }

    /// Build the replacement element, or `None` when the image has no
    /// usable source.
    fn convert(&self, img: &Element) -> Option<Element> {
        let src = match img.attr("src").map(str::trim).filter(|s| !s.is_empty()) {
            Some(src) => src.to_string(),
            None => srcset::parse(img.attr("srcset")?)
                .ok()?
                .first_url()?
                .to_string(),
        };
        let tag = if is_animated(&src) { "amp-anim" } else { "amp-img" };

        let mut element = Element::with_attrs(
            tag,
            img.attrs()
                .iter()
                .filter(|attr| !DROPPED_ATTRIBUTES.contains(&attr.name.as_str()))
                .map(|attr| (attr.name.clone(), attr.value.clone())),
        );
        element.set_attr("src", src.as_str());

        let pixels = |name: &str| img.attr(name).and_then(Dimension::parse).and_then(|d| d.pixels());
        let (mut width, mut height) = (pixels("width"), pixels("height"));
        if width.is_none() || height.is_none() {
            if let Some((w, h)) = self.provider.as_ref().and_then(|p| p.dimensions(&src)) {
                width = width.or(Some(f64::from(w)));
                height = height.or(Some(f64::from(h)));
            }
        }

        let has_layout = img.has_attr("layout") || img.has_attr(LAYOUT_HINT_ATTRIBUTE);
        match (width, height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => {
                element.set_attr("width", format_number(w));
                element.set_attr("height", format_number(h));
                if !has_layout {
                    element.set_attr("layout", LayoutMode::Intrinsic.as_str());
                }
            }
            _ => {
                if let Some(layout) = self.fallback_layout.filter(|_| !has_layout) {
                    element.set_attr(LAYOUT_HINT_ATTRIBUTE, layout.as_str());
                }
            }
        }
        Some(element)
    }
}

impl Default for ImgSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// GIFs become `amp-anim`. Query strings and fragments are ignored.
fn is_animated(src: &str) -> bool {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.to_ascii_lowercase().ends_with(".gif")
}

impl Sanitizer for ImgSanitizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sanitize(
        &mut self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> PipelineResult<PassOutput> {
        let mut converted = 0usize;
        let images: Vec<NodeId> = document.elements_by_tag("img");

        for node in images {
            if is_exempt(document, node) {
                continue;
            }
            let Some(replacement) = document.element(node).and_then(|img| self.convert(img)) else {
                trace!("img without usable source left for validation");
                continue;
            };

            let diagnostic = Diagnostic::new(DiagnosticCode::DisallowedTag)
                .with_node(node, "img")
                .with_detail(format!("converted to {}", replacement.name()));
            if !recorder.emit(diagnostic).is_accepted() {
                continue;
            }

            let new_node = document.create_element(replacement);
            document.move_children(node, new_node);
            document.replace_with(node, new_node);
            converted += 1;
        }

        debug!(converted, "images converted");
        Ok(PassOutput::default())
    }
}
