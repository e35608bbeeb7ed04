//! The `style` pass: gather every style source, tree-shake, budget.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

use super::declarations::{Declaration, parse_declarations};
use super::parser::parse_stylesheet;
use super::rules::{ConditionalRule, CssRule, ParsedStylesheet, StyleRule};
use super::selector::DocumentIndex;
use super::shaker::{SourcedRule, enforce_budget, shake};
use super::{cached, content_hash};
use crate::cache::CachePool;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticRecorder};
use crate::dom::{Document, NodeId};
use crate::passes::dev_mode::is_exempt;
use crate::pipeline::{PassOutput, PipelineResult, Sanitizer};
use crate::utils::{
    CACHE_GROUP_INLINE_STYLE, CACHE_GROUP_STYLE_ELEMENT, CSS_PROPERTY_DENYLIST,
    DEFAULT_KEYFRAMES_MAX_BYTES, DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST,
    DEFAULT_STYLESHEET_MAX_BYTES, INLINE_STYLE_CLASS_PREFIX, INLINE_STYLE_SELECTOR_PREFIX,
};

/// Options of the `style` pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOptions {
    pub max_bytes: usize,
    pub keyframes_max_bytes: usize,
    pub keyframes_property_allowlist: Vec<String>,
    pub convert_inline_styles: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_STYLESHEET_MAX_BYTES,
            keyframes_max_bytes: DEFAULT_KEYFRAMES_MAX_BYTES,
            keyframes_property_allowlist: DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            convert_inline_styles: true,
        }
    }
}

/// Stylesheet collector and tree-shaker
///
/// Removes `<style>` elements and `style` attributes from the document and
/// returns their rules, minus everything no element uses, as one
/// `amp-custom` stylesheet plus a keyframes residue.
pub struct StyleSanitizer {
    cache: Arc<CachePool>,
    options: StyleOptions,
}

impl StyleSanitizer {
    pub const NAME: &'static str = "style";

    pub fn new(cache: Arc<CachePool>, options: StyleOptions) -> Self {
        Self { cache, options }
    }

    #[must_use]
    pub fn options(&self) -> &StyleOptions {
        &self.options
    }

    /// Collect a `<style>` element's rules and remove the element.
    fn collect_style_element(
        &self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
        node: NodeId,
        sources: &mut Vec<SourcedRule>,
    ) {
        let text = document.text_content(node);
        let media = document
            .element(node)
            .and_then(|el| el.attr("media"))
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("all"));

        let parsed: ParsedStylesheet =
            cached(&self.cache, CACHE_GROUP_STYLE_ELEMENT, &text, parse_stylesheet);

        if !parsed.errors.is_empty() {
            let diagnostic = Diagnostic::new(DiagnosticCode::CssSyntaxError)
                .with_node(node, "style")
                .with_detail(parsed.errors.join("; "));
            if !recorder.emit(diagnostic).is_accepted() {
                return;
            }
        }

        let diagnostic = Diagnostic::new(DiagnosticCode::DisallowedTag)
            .with_node(node, "style")
            .with_detail("moved to amp-custom");
        if !recorder.emit(diagnostic).is_accepted() {
            return;
        }

        let rules = match media {
            Some(condition) => vec![CssRule::Conditional(ConditionalRule {
                keyword: "media".to_string(),
                condition,
                rules: parsed.rules,
            })],
            None => parsed.rules,
        };
        trace!(rules = rules.len(), "collected style element");
        push_rules(sources, rules, node, "style");
        document.detach(node);
    }

    /// Turn a `style` attribute into a class plus a high-specificity rule.
    fn convert_inline_style(
        &self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
        node: NodeId,
        generated: &mut HashSet<String>,
        sources: &mut Vec<SourcedRule>,
    ) {
        let Some(element) = document.element(node) else {
            return;
        };
        let tag = element.name().to_string();
        let style = element.attr("style").unwrap_or_default().to_string();

        let mut declarations: Vec<Declaration> =
            cached(&self.cache, CACHE_GROUP_INLINE_STYLE, &style, parse_declarations);

        if declarations.is_empty() {
            let diagnostic = if style.trim().is_empty() {
                Diagnostic::new(DiagnosticCode::DisallowedAttribute).with_detail("empty")
            } else {
                Diagnostic::new(DiagnosticCode::CssSyntaxError).with_detail(style)
            };
            let diagnostic = diagnostic.with_node(node, tag).with_attribute("style");
            if recorder.emit(diagnostic).is_accepted() {
                document.update_element(node, |el| el.remove_attr("style"));
            }
            return;
        }

        let class = format!(
            "{INLINE_STYLE_CLASS_PREFIX}{}",
            &content_hash(&style)[..7]
        );
        let diagnostic = Diagnostic::new(DiagnosticCode::DisallowedAttribute)
            .with_node(node, tag.as_str())
            .with_attribute("style")
            .with_detail(format!("converted to class {class}"));
        if !recorder.emit(diagnostic).is_accepted() {
            return;
        }

        // The selector already outranks the main sheet.
        for declaration in &mut declarations {
            declaration.important = false;
        }

        document.update_element(node, |el| {
            el.remove_attr("style");
            el.add_class(&class);
        });

        if generated.insert(class.clone()) {
            let rule = CssRule::Style(StyleRule {
                selectors: vec![format!("{INLINE_STYLE_SELECTOR_PREFIX} .{class}")],
                declarations,
            });
            push_rules(sources, vec![rule], node, &tag);
        }
    }
}

fn push_rules(sources: &mut Vec<SourcedRule>, rules: Vec<CssRule>, origin: NodeId, tag: &str) {
    for rule in rules {
        let order = sources.len();
        sources.push(SourcedRule {
            rule,
            origin,
            origin_name: tag.to_string(),
            order,
        });
    }
}

/// Declarations that can run code or bind behavior.
fn is_denied(declaration: &Declaration) -> bool {
    let value = declaration.value.to_ascii_lowercase();
    CSS_PROPERTY_DENYLIST.contains(&declaration.property.as_str())
        || (declaration.property == "filter" && value.contains("progid:"))
        || value.contains("expression(")
        || value.contains("javascript:")
}

/// Remove denied declarations and `!important`, one diagnostic each.
fn police(rule: &mut CssRule, origin: NodeId, origin_name: &str, recorder: &mut DiagnosticRecorder<'_>) {
    let police_block = |declarations: &mut Vec<Declaration>, recorder: &mut DiagnosticRecorder<'_>| {
        declarations.retain_mut(|declaration| {
            if is_denied(declaration) {
                let diagnostic = Diagnostic::new(DiagnosticCode::DisallowedCssProperty)
                    .with_node(origin, origin_name)
                    .with_detail(declaration.to_css());
                return !recorder.emit(diagnostic).is_accepted();
            }
            if declaration.important {
                let diagnostic = Diagnostic::new(DiagnosticCode::IllegalCssImportant)
                    .with_node(origin, origin_name)
                    .with_detail(declaration.to_css());
                if recorder.emit(diagnostic).is_accepted() {
                    declaration.important = false;
                }
            }
            true
        });
    };

    match rule {
        CssRule::Style(style) => police_block(&mut style.declarations, recorder),
        CssRule::Keyframes(keyframes) => {
            for frame in &mut keyframes.frames {
                police_block(&mut frame.declarations, recorder);
            }
        }
        CssRule::Conditional(conditional) => {
            for nested in &mut conditional.rules {
                police(nested, origin, origin_name, recorder);
            }
        }
        CssRule::Other(_) => {}
    }
}

fn join(rules: &[SourcedRule]) -> String {
    rules.iter().map(|sourced| sourced.rule.to_css()).collect()
}

impl Sanitizer for StyleSanitizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sanitize(
        &mut self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> PipelineResult<PassOutput> {
        let mut sources = Vec::new();
        let mut generated = HashSet::new();

        for node in document.descendant_elements() {
            if !document.is_attached(node) || is_exempt(document, node) {
                continue;
            }
            let Some(element) = document.element(node) else {
                continue;
            };
            let is_style_element = element.name() == "style";
            let is_boilerplate = element.has_attr("amp-boilerplate");
            let has_inline_style = element.has_attr("style");

            if is_style_element {
                if !is_boilerplate {
                    self.collect_style_element(document, recorder, node, &mut sources);
                }
                continue;
            }
            if has_inline_style && self.options.convert_inline_styles {
                self.convert_inline_style(document, recorder, node, &mut generated, &mut sources);
            }
        }

        for sourced in &mut sources {
            police(&mut sourced.rule, sourced.origin, &sourced.origin_name, recorder);
        }

        let index = DocumentIndex::build(document);
        let outcome = shake(
            document,
            &index,
            sources,
            &self.options.keyframes_property_allowlist,
        );

        let mut main = outcome.main;
        let mut residue = outcome.residue;
        enforce_budget(
            &mut main,
            self.options.max_bytes,
            DiagnosticCode::StylesheetTooLong,
            recorder,
        );
        enforce_budget(
            &mut residue,
            self.options.keyframes_max_bytes,
            DiagnosticCode::KeyframesTooLong,
            recorder,
        );

        let mut output = PassOutput::default();
        let stylesheet = join(&main);
        if !stylesheet.is_empty() {
            output.stylesheets.push(stylesheet);
        }
        let keyframes = join(&residue);
        if !keyframes.is_empty() {
            output.keyframes.push(keyframes);
        }
        debug!(
            stylesheet_bytes = output.stylesheets.iter().map(String::len).sum::<usize>(),
            keyframes_bytes = output.keyframes.iter().map(String::len).sum::<usize>(),
            "style pass finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(html: &str, options: StyleOptions) -> (Document, PassOutput, Vec<Diagnostic>) {
        let mut doc = Document::parse_fragment(html);
        let cache = Arc::new(CachePool::local(8).expect("valid capacity"));
        let mut pass = StyleSanitizer::new(cache, options);
        let mut recorder = DiagnosticRecorder::accept_all();
        let output = pass.sanitize(&mut doc, &mut recorder).expect("style pass");
        (doc, output, recorder.take_accepted())
    }

    #[test]
    fn test_style_element_is_collected_and_removed() {
        let (doc, output, _) = run(
            "<style>p{color:red} .unused{color:blue}</style><p>x</p>",
            StyleOptions::default(),
        );
        assert_eq!(doc.to_html(), "<p>x</p>");
        assert_eq!(output.stylesheets, vec!["p{color:red}".to_string()]);
    }

    #[test]
    fn test_inline_style_becomes_scoped_class() {
        let (doc, output, _) = run(
            r#"<p style="color: red !important">x</p>"#,
            StyleOptions::default(),
        );
        let class = format!("amp-wp-{}", &content_hash("color: red !important")[..7]);
        assert_eq!(doc.to_html(), format!(r#"<p class="{class}">x</p>"#));
        assert_eq!(
            output.stylesheets,
            vec![format!("{INLINE_STYLE_SELECTOR_PREFIX} .{class}{{color:red}}")]
        );
    }

    #[test]
    fn test_identical_inline_styles_share_one_rule() {
        let (_, output, _) = run(
            r#"<p style="color:red">a</p><p style="color:red">b</p>"#,
            StyleOptions::default(),
        );
        assert_eq!(output.stylesheets[0].matches("color:red").count(), 1);
    }

    #[test]
    fn test_media_attribute_wraps_rules() {
        let (_, output, _) = run(
            r#"<style media="print">p{color:red}</style><p>x</p>"#,
            StyleOptions::default(),
        );
        assert_eq!(output.stylesheets, vec!["@media print{p{color:red}}".to_string()]);
    }

    #[test]
    fn test_denied_properties_and_important() {
        let (_, output, diagnostics) = run(
            "<style>p{behavior:url(x.htc);color:red!important;filter:progid:DXImageTransform.Microsoft.Alpha(opacity=50)}</style><p>x</p>",
            StyleOptions::default(),
        );
        assert_eq!(output.stylesheets, vec!["p{color:red}".to_string()]);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::DisallowedTag,
                DiagnosticCode::DisallowedCssProperty,
                DiagnosticCode::IllegalCssImportant,
                DiagnosticCode::DisallowedCssProperty,
            ]
        );
    }

    #[test]
    fn test_keyframes_go_to_residue() {
        let (_, output, _) = run(
            "<style>@keyframes fade{from{opacity:0}to{opacity:1}} p{color:red}</style><p>x</p>",
            StyleOptions::default(),
        );
        assert_eq!(output.stylesheets, vec!["p{color:red}".to_string()]);
        assert_eq!(
            output.keyframes,
            vec!["@keyframes fade{from{opacity:0}to{opacity:1}}".to_string()]
        );
    }

    #[test]
    fn test_budget_is_enforced() {
        let options = StyleOptions {
            max_bytes: 12,
            ..StyleOptions::default()
        };
        let (_, output, diagnostics) = run(
            "<style>p{color:red}p{color:blue}</style><p>x</p>",
            options,
        );
        assert_eq!(output.stylesheets, vec!["p{color:red}".to_string()]);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::DisallowedTag, DiagnosticCode::StylesheetTooLong]
        );
    }

    #[test]
    fn test_exempt_styles_are_left_alone() {
        let html = r#"<div data-ampdevmode=""><style>p{color:red}</style><p style="color:blue">x</p></div>"#;
        let (doc, output, _) = run(html, StyleOptions::default());
        assert_eq!(doc.to_html(), html.replace("data-ampdevmode=\"\"", "data-ampdevmode"));
        assert!(output.stylesheets.is_empty());
    }

    #[test]
    fn test_rejected_moves_leave_style_sources_in_place() {
        let html = r#"<style>p{color:red}</style><p style="color:blue">x</p>"#;
        let mut doc = Document::parse_fragment(html);
        let cache = Arc::new(CachePool::local(8).expect("valid capacity"));
        let mut pass = StyleSanitizer::new(cache, StyleOptions::default());
        let mut recorder = DiagnosticRecorder::with_callback(|_| false);
        let output = pass.sanitize(&mut doc, &mut recorder).expect("style pass");

        assert_eq!(doc.to_html(), html);
        assert!(output.stylesheets.is_empty());
        let rejected: Vec<_> = recorder.take_rejected().iter().map(|d| d.code).collect();
        assert_eq!(
            rejected,
            vec![DiagnosticCode::DisallowedTag, DiagnosticCode::DisallowedAttribute]
        );
    }

    #[test]
    fn test_inline_conversion_can_be_disabled() {
        let options = StyleOptions {
            convert_inline_styles: false,
            ..StyleOptions::default()
        };
        let (doc, output, _) = run(r#"<p style="color:red">x</p>"#, options);
        assert_eq!(doc.to_html(), r#"<p style="color:red">x</p>"#);
        assert!(output.stylesheets.is_empty());
    }
}
