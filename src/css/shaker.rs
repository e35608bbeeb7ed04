//! Unused-rule elimination, keyframes extraction and byte budgets

use std::collections::HashSet;
use tracing::{debug, warn};

use super::declarations::split_top_level;
use super::rules::{CssRule, KeyframesRule};
use super::selector::DocumentIndex;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticRecorder};
use crate::dom::{Document, NodeId};

/// A rule together with the style source it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedRule {
    pub rule: CssRule,
    /// `<style>` element or element carrying the converted inline style.
    pub origin: NodeId,
    /// Origin tag name, for diagnostics.
    pub origin_name: String,
    /// Position across all sources, in document order.
    pub order: usize,
}

/// Rules split into the main sheet and the keyframes residue
#[derive(Debug, Default)]
pub struct ShakeOutcome {
    pub main: Vec<SourcedRule>,
    pub residue: Vec<SourcedRule>,
    pub dropped_rules: usize,
}

/// Drop rules no live element matches and move allow-listed keyframes into
/// the residue. Relative order is preserved in both outputs.
pub fn shake(
    document: &Document,
    index: &DocumentIndex,
    rules: Vec<SourcedRule>,
    keyframes_allowlist: &[String],
) -> ShakeOutcome {
    let mut outcome = ShakeOutcome::default();

    for sourced in rules {
        let SourcedRule {
            rule,
            origin,
            origin_name,
            order,
        } = sourced;
        let rebuild = |rule| SourcedRule {
            rule,
            origin,
            origin_name: origin_name.clone(),
            order,
        };
        match rule {
            CssRule::Keyframes(keyframes) => {
                if is_isolated(&keyframes, keyframes_allowlist) {
                    outcome.residue.push(rebuild(CssRule::Keyframes(keyframes)));
                } else {
                    outcome.main.push(rebuild(CssRule::Keyframes(keyframes)));
                }
            }
            other => match shake_rule(document, index, other) {
                Some(rule) => outcome.main.push(rebuild(rule)),
                None => outcome.dropped_rules += 1,
            },
        }
    }

    // Keyframes left in the main sheet survive only when a used rule
    // refers to them.
    let referenced = animation_names(&outcome.main);
    let before = outcome.main.len();
    outcome
        .main
        .retain_mut(|sourced| prune_keyframes(&mut sourced.rule, &referenced));
    outcome.dropped_rules += before - outcome.main.len();

    debug!(
        kept = outcome.main.len(),
        keyframes = outcome.residue.len(),
        dropped = outcome.dropped_rules,
        "stylesheet tree-shaken"
    );
    outcome
}

/// Whether every property of the keyframes block is allow-listed.
fn is_isolated(keyframes: &KeyframesRule, allowlist: &[String]) -> bool {
    keyframes
        .properties()
        .all(|property| allowlist.iter().any(|allowed| allowed == property))
}

fn shake_rule(document: &Document, index: &DocumentIndex, rule: CssRule) -> Option<CssRule> {
    match rule {
        CssRule::Style(mut style) => {
            style
                .selectors
                .retain(|selector| index.is_selector_text_used(document, selector));
            (!style.selectors.is_empty()).then_some(CssRule::Style(style))
        }
        CssRule::Conditional(mut conditional) => {
            conditional.rules = conditional
                .rules
                .into_iter()
                .filter_map(|nested| match nested {
                    CssRule::Keyframes(_) => Some(nested),
                    other => shake_rule(document, index, other),
                })
                .collect();
            (!conditional.rules.is_empty()).then_some(CssRule::Conditional(conditional))
        }
        other => Some(other),
    }
}

/// Remove unreferenced keyframes; returns whether the rule survives.
fn prune_keyframes(rule: &mut CssRule, referenced: &HashSet<String>) -> bool {
    match rule {
        CssRule::Keyframes(keyframes) => referenced.contains(&keyframes.name),
        CssRule::Conditional(conditional) => {
            conditional
                .rules
                .retain_mut(|nested| prune_keyframes(nested, referenced));
            !conditional.rules.is_empty()
        }
        _ => true,
    }
}

/// Every token of `animation` / `animation-name` values in style rules.
/// Shorthand tokens that are not names (durations, easings) are harmless
/// extras.
fn animation_names(rules: &[SourcedRule]) -> HashSet<String> {
    fn collect(rule: &CssRule, names: &mut HashSet<String>) {
        match rule {
            CssRule::Style(style) => {
                for declaration in &style.declarations {
                    let property = declaration.property.as_str();
                    if property.ends_with("animation") || property.ends_with("animation-name") {
                        for animation in split_top_level(&declaration.value, ',') {
                            names.extend(animation.split_whitespace().map(str::to_string));
                        }
                    }
                }
            }
            CssRule::Conditional(conditional) => {
                for nested in &conditional.rules {
                    collect(nested, names);
                }
            }
            _ => {}
        }
    }

    let mut names = HashSet::new();
    for sourced in rules {
        collect(&sourced.rule, &mut names);
    }
    names
}

/// Drop rules from the end until the serialized size fits `max_bytes`.
/// Each drop is offered as a `code` diagnostic; a rejected drop keeps the
/// rule and the next earlier one is tried instead. Returns the number of
/// dropped rules.
pub fn enforce_budget(
    rules: &mut Vec<SourcedRule>,
    max_bytes: usize,
    code: DiagnosticCode,
    recorder: &mut DiagnosticRecorder<'_>,
) -> usize {
    let sizes: Vec<usize> = rules.iter().map(|sourced| sourced.rule.to_css().len()).collect();
    let mut total: usize = sizes.iter().sum();
    if total <= max_bytes {
        return 0;
    }
    warn!(total, max_bytes, code = %code, "stylesheet over budget, dropping trailing rules");

    let mut keep = vec![true; rules.len()];
    for position in (0..rules.len()).rev() {
        if total <= max_bytes {
            break;
        }
        let sourced = &rules[position];
        let diagnostic = Diagnostic::new(code)
            .with_node(sourced.origin, sourced.origin_name.clone())
            .with_detail(sourced.rule.label());
        if recorder.emit(diagnostic).is_accepted() {
            keep[position] = false;
            total -= sizes[position];
        }
    }

    let mut flags = keep.into_iter();
    rules.retain(|_| flags.next().unwrap_or(true));
    sizes.len() - rules.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;

    fn sourced(doc: &Document, css: &str) -> Vec<SourcedRule> {
        parse_stylesheet(css)
            .rules
            .into_iter()
            .enumerate()
            .map(|(order, rule)| SourcedRule {
                rule,
                origin: doc.root(),
                origin_name: "style".into(),
                order,
            })
            .collect()
    }

    fn allowlist() -> Vec<String> {
        crate::utils::DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST
            .iter()
            .map(|p| (*p).to_string())
            .collect()
    }

    fn css(rules: &[SourcedRule]) -> String {
        rules.iter().map(|s| s.rule.to_css()).collect()
    }

    #[test]
    fn test_unused_rules_and_empty_media_are_dropped() {
        let doc = Document::parse_fragment(r#"<p class="a">x</p>"#);
        let index = DocumentIndex::build(&doc);
        let outcome = shake(
            &doc,
            &index,
            sourced(&doc, ".a,.b{color:red}.c{color:blue}@media print{.c{color:red}}@media screen{.a{margin:0}}"),
            &allowlist(),
        );
        assert_eq!(css(&outcome.main), ".a{color:red}@media screen{.a{margin:0}}");
        assert_eq!(outcome.dropped_rules, 2);
    }

    #[test]
    fn test_keyframes_isolation_and_reference_pruning() {
        let doc = Document::parse_fragment(r#"<p class="a">x</p>"#);
        let index = DocumentIndex::build(&doc);
        let outcome = shake(
            &doc,
            &index,
            sourced(
                &doc,
                "@keyframes fade{from{opacity:0}to{opacity:1}}\
                 @keyframes grow{from{width:0}to{width:10px}}\
                 @keyframes shrink{from{width:10px}to{width:0}}\
                 .a{animation:grow 1s ease}",
            ),
            &allowlist(),
        );
        assert_eq!(css(&outcome.residue), "@keyframes fade{from{opacity:0}to{opacity:1}}");
        assert_eq!(
            css(&outcome.main),
            "@keyframes grow{from{width:0}to{width:10px}}.a{animation:grow 1s ease}"
        );
    }

    #[test]
    fn test_budget_drops_from_the_end() {
        let doc = Document::parse_fragment("<p>x</p>");
        let mut rules = sourced(&doc, "p{color:red}p{color:blue}p{color:green}");
        let mut recorder = DiagnosticRecorder::accept_all();
        let dropped = enforce_budget(&mut rules, 26, DiagnosticCode::StylesheetTooLong, &mut recorder);
        assert_eq!(dropped, 1);
        assert_eq!(css(&rules), "p{color:red}p{color:blue}");
        let diagnostics = recorder.take_accepted();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("p"));
    }

    #[test]
    fn test_rejected_budget_drop_keeps_rule() {
        let doc = Document::parse_fragment("<p>x</p>");
        let mut rules = sourced(&doc, "p{color:red}p{color:blue}");
        let mut recorder = DiagnosticRecorder::with_callback(|_| false);
        let dropped = enforce_budget(&mut rules, 1, DiagnosticCode::StylesheetTooLong, &mut recorder);
        assert_eq!(dropped, 0);
        assert_eq!(rules.len(), 2);
        assert_eq!(recorder.take_rejected().len(), 2);
    }
}
