//! Tag and attribute validation
//!
//! A single top-down walk evaluates every element against the spec table.
//! Per element, in order: tag allowance, attribute allowance, attribute
//! values (srcset included), mutually exclusive attributes, required
//! attribute combinations, layout, and finally the runtime components the
//! surviving element needs. Every mutation is gated by the diagnostic
//! recorder; layout normalization is applied regardless, except that a
//! rejected invalid-layout diagnostic leaves the element untouched.

pub mod srcset;
mod verdict;

pub use verdict::ValidationVerdict;

use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticRecorder};
use crate::dom::{Document, NodeId};
use crate::layout;
use crate::passes::dev_mode::has_marker;
use crate::pipeline::{PassOutput, PipelineResult, Sanitizer};
use crate::spec::{AttributeConstraint, Disallowed, Recovery, SpecRule, SpecTable};

/// The `tag-and-attribute` pass
pub struct TagAndAttributeSanitizer {
    table: &'static SpecTable,
    strict: bool,
}

impl TagAndAttributeSanitizer {
    pub const NAME: &'static str = "tag-and-attribute";

    pub fn new(table: &'static SpecTable) -> Self {
        Self {
            table,
            strict: false,
        }
    }

    /// Strict mode never unwraps: disallowed tags are always stripped.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate one element, applying attribute-level fixes in place.
    pub fn validate(
        &self,
        document: &mut Document,
        node: NodeId,
        recorder: &mut DiagnosticRecorder<'_>,
        components: &mut BTreeSet<String>,
    ) -> ValidationVerdict {
        let Some(element) = document.element(node) else {
            return ValidationVerdict::Keep;
        };
        let tag = element.name().to_string();
        let rule = self.table.lookup(element);

        if let Some(disposition) = rule.disallowed {
            return self.disallowed_tag(document, node, &tag, disposition, recorder);
        }

        let mut verdict = ValidationVerdict::Keep;
        let mut record_strip = |name: &str| {
            if verdict == ValidationVerdict::Keep {
                verdict = ValidationVerdict::StripAttribute(name.to_string());
            }
        };

        for name in self.check_attributes(document, node, &tag, &rule, recorder) {
            record_strip(&name);
        }
        for name in check_exclusive_groups(document, node, &tag, &rule, recorder) {
            record_strip(&name);
        }
        match check_required(document, node, &tag, &rule, recorder) {
            Required::Satisfied(stripped) => {
                for name in stripped {
                    record_strip(&name);
                }
            }
            Required::StripNode => return ValidationVerdict::StripNode,
        }

        apply_layout(document, node, &tag, &rule, recorder);

        if let Some(element) = document.element(node) {
            components.extend(rule.components.iter().cloned());
            components.extend(
                rule.attribute_components
                    .iter()
                    .filter(|(attribute, _)| element.has_attr(attribute))
                    .map(|(_, component)| component.clone()),
            );
        }
        verdict
    }

    fn disallowed_tag(
        &self,
        document: &mut Document,
        node: NodeId,
        tag: &str,
        disposition: Disallowed,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> ValidationVerdict {
        let unwrap = disposition == Disallowed::Unwrap && !self.strict;
        let diagnostic = Diagnostic::new(DiagnosticCode::DisallowedTag)
            .with_node(node, tag)
            .with_detail(if unwrap { "unwrapped" } else { "removed" });
        if !recorder.emit(diagnostic).is_accepted() {
            return ValidationVerdict::Keep;
        }
        if unwrap {
            ValidationVerdict::ReplaceNode(document.children(node))
        } else {
            ValidationVerdict::StripNode
        }
    }

    /// Allowance and value checks. Returns the removed attribute names.
    fn check_attributes(
        &self,
        document: &mut Document,
        node: NodeId,
        tag: &str,
        rule: &SpecRule,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> Vec<String> {
        let attributes: Vec<(String, String)> = document
            .element(node)
            .map(|el| {
                el.attrs()
                    .iter()
                    .map(|attr| (attr.name.clone(), attr.value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut stripped = Vec::new();
        for (name, value) in attributes {
            let diagnostic = match self.table.attribute_constraint(rule, &name) {
                None => Diagnostic::new(DiagnosticCode::DisallowedAttribute),
                Some(AttributeConstraint::Srcset) => {
                    match normalize_srcset(document, node, tag, &name, &value, recorder) {
                        Ok(()) => continue,
                        Err(detail) => {
                            Diagnostic::new(DiagnosticCode::InvalidAttributeValue).with_detail(detail)
                        }
                    }
                }
                Some(constraint) if constraint.check(&value) => continue,
                Some(_) => {
                    Diagnostic::new(DiagnosticCode::InvalidAttributeValue).with_detail(value)
                }
            };
            let diagnostic = diagnostic.with_node(node, tag).with_attribute(name.as_str());
            if recorder.emit(diagnostic).is_accepted() {
                document.update_element(node, |el| el.remove_attr(&name));
                stripped.push(name);
            }
        }
        stripped
    }
}

/// Rewrite a valid srcset in normalized form and report descriptors shared
/// by different URLs. Returns the parse error text when the value is
/// invalid.
fn normalize_srcset(
    document: &mut Document,
    node: NodeId,
    tag: &str,
    name: &str,
    value: &str,
    recorder: &mut DiagnosticRecorder<'_>,
) -> Result<(), String> {
    let parsed = srcset::parse(value).map_err(|e| e.to_string())?;
    for duplicate in &parsed.duplicates {
        recorder.emit(
            Diagnostic::new(DiagnosticCode::DuplicateDimension)
                .with_node(node, tag)
                .with_attribute(name)
                .with_detail(duplicate.to_string()),
        );
    }
    let normalized = parsed.to_string();
    if normalized != value {
        trace!(before = value, after = %normalized, "srcset normalized");
        document.update_element(node, |el| el.set_attr(name, normalized));
    }
    Ok(())
}

/// Keep the first present attribute of each exclusive group.
fn check_exclusive_groups(
    document: &mut Document,
    node: NodeId,
    tag: &str,
    rule: &SpecRule,
    recorder: &mut DiagnosticRecorder<'_>,
) -> Vec<String> {
    let mut stripped = Vec::new();
    for group in &rule.mutually_exclusive_groups {
        let present: Vec<&String> = match document.element(node) {
            Some(element) => group.iter().filter(|name| element.has_attr(name)).collect(),
            None => return stripped,
        };
        let Some((winner, losers)) = present.split_first() else {
            continue;
        };
        for loser in losers {
            let diagnostic = Diagnostic::new(DiagnosticCode::MutuallyExclusiveAttrs)
                .with_node(node, tag)
                .with_attribute(loser.as_str())
                .with_detail(format!("conflicts with {winner}"));
            if recorder.emit(diagnostic).is_accepted() {
                document.update_element(node, |el| el.remove_attr(loser));
                stripped.push((*loser).clone());
            }
        }
    }
    stripped
}

enum Required {
    /// Element survives; holds attributes removed by recovery.
    Satisfied(Vec<String>),
    StripNode,
}

fn check_required(
    document: &mut Document,
    node: NodeId,
    tag: &str,
    rule: &SpecRule,
    recorder: &mut DiagnosticRecorder<'_>,
) -> Required {
    let mut stripped = Vec::new();
    for combination in &rule.required_combinations {
        let missing: Vec<&String> = match document.element(node) {
            Some(element) if combination.is_triggered(element) => combination
                .requires
                .iter()
                .filter(|name| !element.has_attr(name))
                .collect(),
            _ => continue,
        };

        for name in missing {
            let default = combination.default_for(name);
            let mut diagnostic = Diagnostic::new(DiagnosticCode::MissingRequiredAttribute)
                .with_node(node, tag)
                .with_attribute(name.as_str());
            if let Some(default) = default {
                diagnostic = diagnostic.with_detail(format!("defaulted to \"{default}\""));
            }
            if !recorder.emit(diagnostic).is_accepted() {
                continue;
            }

            match (default, combination.recovery) {
                (Some(default), _) => {
                    document.update_element(node, |el| el.set_attr(name, default));
                }
                (None, Recovery::SynthesizeDefault) => {
                    document.update_element(node, |el| el.set_attr(name, ""));
                }
                (None, Recovery::StripNode) => return Required::StripNode,
                (None, Recovery::StripAttribute) => {
                    for trigger in &combination.trigger {
                        let removed = document
                            .update_element(node, |el| el.remove_attr(trigger))
                            .flatten();
                        if removed.is_some() {
                            stripped.push(trigger.clone());
                        }
                    }
                }
            }
        }
    }
    Required::Satisfied(stripped)
}

fn apply_layout(
    document: &mut Document,
    node: NodeId,
    tag: &str,
    rule: &SpecRule,
    recorder: &mut DiagnosticRecorder<'_>,
) {
    let Some(decision) = layout::resolve(document, node, rule) else {
        return;
    };
    if let Some(invalid) = &decision.invalid_layout {
        let diagnostic = Diagnostic::new(DiagnosticCode::InvalidAttributeValue)
            .with_node(node, tag)
            .with_attribute("layout")
            .with_detail(invalid.as_str());
        if !recorder.emit(diagnostic).is_accepted() {
            return;
        }
    }
    trace!(tag, layout = %decision.mode, "layout applied");
    document.update_element(node, |el| decision.apply(el));
}

impl Sanitizer for TagAndAttributeSanitizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sanitize(
        &mut self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> PipelineResult<PassOutput> {
        let mut output = PassOutput::default();
        let mut stack: Vec<NodeId> = document.element_children(document.root());
        stack.reverse();
        let mut visited = 0usize;
        let mut removed = 0usize;

        while let Some(node) = stack.pop() {
            if document.element(node).is_none() {
                continue;
            }
            // Exemption covers the marked element and its whole subtree.
            if has_marker(document, node) {
                continue;
            }
            visited += 1;

            match self.validate(document, node, recorder, &mut output.components) {
                ValidationVerdict::Keep | ValidationVerdict::StripAttribute(_) => {
                    stack.extend(document.element_children(node).into_iter().rev());
                }
                ValidationVerdict::StripNode => {
                    document.detach(node);
                    removed += 1;
                }
                ValidationVerdict::ReplaceNode(replacements) => {
                    for replacement in &replacements {
                        document.insert_before(node, *replacement);
                    }
                    document.detach(node);
                    removed += 1;
                    stack.extend(replacements.into_iter().rev());
                }
            }
        }

        debug!(
            visited,
            removed,
            components = output.components.len(),
            "tag and attribute validation finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(
        html: &str,
        strict: bool,
        accept: bool,
    ) -> (String, PassOutput, Vec<Diagnostic>, Vec<Diagnostic>) {
        let mut doc = Document::parse_fragment(html);
        let mut pass = TagAndAttributeSanitizer::new(SpecTable::builtin()).strict(strict);
        let mut recorder = DiagnosticRecorder::with_callback(move |_| accept);
        let output = pass.sanitize(&mut doc, &mut recorder).expect("validation");
        (
            doc.to_html(),
            output,
            recorder.take_accepted(),
            recorder.take_rejected(),
        )
    }

    fn run(html: &str) -> (String, PassOutput, Vec<Diagnostic>) {
        let (html, output, accepted, _) = run_with(html, false, true);
        (html, output, accepted)
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_disallowed_tag_is_stripped_with_subtree() {
        let (html, _, diagnostics) = run("<p>a<iframe src=\"x\"><b>b</b></iframe></p>");
        assert_eq!(html, "<p>a</p>");
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DisallowedTag]);
    }

    #[test]
    fn test_presentational_tag_is_unwrapped() {
        let (html, _, diagnostics) = run("<p><font color=\"red\">hi <blink>there</blink></font></p>");
        assert_eq!(html, "<p>hi there</p>");
        assert_eq!(
            codes(&diagnostics),
            vec![DiagnosticCode::DisallowedTag, DiagnosticCode::DisallowedTag]
        );
    }

    #[test]
    fn test_strict_mode_strips_instead_of_unwrapping() {
        let (html, _, _, _) = run_with("<p><font>hi</font>!</p>", true, true);
        assert_eq!(html, "<p>!</p>");
    }

    #[test]
    fn test_disallowed_and_invalid_attributes() {
        let (html, _, diagnostics) =
            run(r#"<a href="javascript:alert(1)" onclick="x()" title="t">x</a>"#);
        assert_eq!(html, r#"<a title="t">x</a>"#);
        assert_eq!(
            codes(&diagnostics),
            vec![
                DiagnosticCode::InvalidAttributeValue,
                DiagnosticCode::DisallowedAttribute
            ]
        );
        assert_eq!(diagnostics[1].attribute.as_deref(), Some("onclick"));
    }

    #[test]
    fn test_mutually_exclusive_keeps_first_declared() {
        let (html, output, diagnostics) = run(
            r#"<form action="https://example.com/a" action-xhr="https://example.com/b" target="_top"></form>"#,
        );
        assert_eq!(html, r#"<form action-xhr="https://example.com/b" target="_top"></form>"#);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::MutuallyExclusiveAttrs]);
        assert!(output.components.contains("amp-form"));
    }

    #[test]
    fn test_required_attribute_default_is_synthesized() {
        let (html, _, diagnostics) = run(r#"<form action-xhr="https://example.com/b"></form>"#);
        assert_eq!(html, r#"<form action-xhr="https://example.com/b" target="_top"></form>"#);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::MissingRequiredAttribute]);
    }

    #[test]
    fn test_missing_required_attribute_strips_node() {
        let (html, output, diagnostics) = run(r#"<p><amp-img width="10" height="10"></amp-img></p>"#);
        assert_eq!(html, "<p></p>");
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::MissingRequiredAttribute]);
        assert!(output.components.is_empty());
    }

    #[test]
    fn test_srcset_normalization_and_duplicates() {
        let (html, _, diagnostics) = run(
            r#"<amp-img src="a.jpg" srcset="a.jpg, b.jpg 300w, b.jpg 300w" width="10" height="10"></amp-img>"#,
        );
        assert!(html.contains(r#"srcset="a.jpg 1x, b.jpg 300w""#));
        assert!(diagnostics.is_empty());

        let (html, _, diagnostics) = run(
            r#"<amp-img src="a.jpg" srcset="a.jpg 300w, b.jpg 300w" width="10" height="10"></amp-img>"#,
        );
        assert!(html.contains(r#"srcset="a.jpg 300w, b.jpg 300w""#));
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DuplicateDimension]);

        let (html, _, diagnostics) = run(
            r#"<amp-img src="a.jpg" srcset="a.jpg 0w" width="10" height="10"></amp-img>"#,
        );
        assert!(!html.contains("srcset"));
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::InvalidAttributeValue]);
    }

    #[test]
    fn test_layout_is_applied_and_components_recorded() {
        let (html, output, _) =
            run(r#"<amp-img src="a.jpg" width="300" height="200" lightbox></amp-img>"#);
        assert_eq!(
            html,
            r#"<amp-img src="a.jpg" width="300" height="200" lightbox layout="responsive"></amp-img>"#
        );
        assert_eq!(
            output.components.into_iter().collect::<Vec<_>>(),
            vec!["amp-lightbox-gallery".to_string()]
        );
    }

    #[test]
    fn test_invalid_layout_value() {
        let (html, _, diagnostics) =
            run(r#"<amp-img src="a.jpg" width="300" height="200" layout="bogus"></amp-img>"#);
        assert!(html.contains(r#"layout="responsive""#));
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::InvalidAttributeValue]);

        let (html, _, _, rejected) = run_with(
            r#"<amp-img src="a.jpg" width="300" height="200" layout="bogus"></amp-img>"#,
            false,
            false,
        );
        assert!(html.contains(r#"layout="bogus""#));
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_rejected_diagnostics_keep_markup() {
        let input = r#"<p onclick="x()"><font>hi</font><iframe src="x"></iframe></p>"#;
        let (html, _, accepted, rejected) = run_with(input, false, false);
        assert_eq!(html, input);
        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 3);
    }

    #[test]
    fn test_dev_mode_subtree_is_skipped() {
        let input = r#"<div data-ampdevmode><iframe src="x"></iframe></div><iframe src="y"></iframe>"#;
        let (html, _, diagnostics) = run(input);
        assert_eq!(html, r#"<div data-ampdevmode><iframe src="x"></iframe></div>"#);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_second_run_is_silent() {
        let input = r#"<p style="color:red"><font>a</font><amp-img src="a.jpg" width="100%" height="100%"></amp-img></p>"#;
        let (first, _, _) = run(input);
        let (second, _, diagnostics) = run(&first);
        assert_eq!(first, second);
        assert!(diagnostics.is_empty());
    }
}
