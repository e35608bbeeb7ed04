//! Sanitizer pipeline orchestration
//!
//! A [`Pipeline`] runs an ordered list of passes over one shared
//! [`Document`]. Passes talk to each other only through the document; their
//! side outputs are merged in pass order into a [`SanitizeResult`]. A pass
//! that fails or panics aborts the run and nothing is rolled back, so hosts
//! that need atomicity run on a clone.

mod errors;
mod pass;
pub mod registry;

pub use errors::{PipelineResult, SanitizeError};
pub use pass::{PassOutput, Sanitizer};
pub use registry::{PassContext, REGISTERED_PASSES, build_pass};

use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::CachePool;
use crate::config::SanitizerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticRecorder};
use crate::dom::Document;

/// Merged outcome of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SanitizeResult {
    pub serialized_markup: String,
    pub required_components: BTreeSet<String>,
    /// `amp-custom` stylesheet fragments in pass order.
    pub stylesheets: Vec<String>,
    /// `amp-keyframes` fragments in pass order.
    pub keyframes: Vec<String>,
    /// Accepted diagnostics: pass order, then document order.
    pub diagnostics: Vec<Diagnostic>,
    /// Rejected diagnostics; their mutations were not applied.
    pub suppressed: Vec<Diagnostic>,
}

/// Where a pipeline is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Index into the pass list. Stays here when the pass aborts the run.
    Running(usize),
    Merged,
    Done,
}

/// Ordered list of passes
pub struct Pipeline {
    passes: Vec<Box<dyn Sanitizer>>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(passes: Vec<Box<dyn Sanitizer>>) -> Self {
        Self {
            passes,
            state: PipelineState::Idle,
        }
    }

    /// Build the configured pass list.
    ///
    /// # Errors
    ///
    /// Returns the registry error of the first pass entry that cannot be
    /// built.
    pub fn from_config(config: &SanitizerConfig, context: &PassContext) -> PipelineResult<Self> {
        let passes = config
            .passes()
            .iter()
            .map(|pass| build_pass(pass, config, context))
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self::new(passes))
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Run with every diagnostic accepted.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with`].
    pub fn run(&mut self, document: &mut Document) -> PipelineResult<SanitizeResult> {
        self.execute(document, DiagnosticRecorder::accept_all())
    }

    /// Run with a caller-supplied accept/reject callback.
    ///
    /// # Errors
    ///
    /// - [`SanitizeError::MalformedDocument`] when the input tree is not
    ///   structurally valid
    /// - [`SanitizeError::PassFailed`] / [`SanitizeError::PassPanicked`]
    ///   when a pass aborts
    /// - [`SanitizeError::CorruptedByPass`] when a pass leaves an invalid
    ///   tree behind
    pub fn run_with<'a>(
        &mut self,
        document: &mut Document,
        callback: impl FnMut(&Diagnostic) -> bool + 'a,
    ) -> PipelineResult<SanitizeResult> {
        self.execute(document, DiagnosticRecorder::with_callback(callback))
    }

    fn execute(
        &mut self,
        document: &mut Document,
        mut recorder: DiagnosticRecorder<'_>,
    ) -> PipelineResult<SanitizeResult> {
        self.state = PipelineState::Idle;
        document
            .check_integrity()
            .map_err(SanitizeError::MalformedDocument)?;

        let mut result = SanitizeResult::default();
        for (index, pass) in self.passes.iter_mut().enumerate() {
            self.state = PipelineState::Running(index);
            let name = pass.name().to_string();
            recorder.set_pass(&name);
            debug!(pass = %name, index, "running sanitizer pass");

            let output = match catch_unwind(AssertUnwindSafe(|| {
                pass.sanitize(document, &mut recorder)
            })) {
                Ok(Ok(output)) => output,
                Ok(Err(error)) => {
                    return Err(SanitizeError::PassFailed {
                        pass: name,
                        message: error.to_string(),
                    });
                }
                Err(payload) => {
                    return Err(SanitizeError::PassPanicked {
                        pass: name,
                        message: panic_message(payload.as_ref()),
                    });
                }
            };

            document
                .check_integrity()
                .map_err(|reason| SanitizeError::CorruptedByPass {
                    pass: name.clone(),
                    reason,
                })?;

            result.required_components.extend(output.components);
            result.stylesheets.extend(output.stylesheets);
            result.keyframes.extend(output.keyframes);
        }

        self.state = PipelineState::Merged;
        result.serialized_markup = document.to_html();
        result.diagnostics = recorder.take_accepted();
        result.suppressed = recorder.take_rejected();
        if !result.suppressed.is_empty() {
            warn!(
                suppressed = result.suppressed.len(),
                "diagnostics rejected by callback, non-compliant markup kept"
            );
        }
        info!(
            passes = self.passes.len(),
            diagnostics = result.diagnostics.len(),
            components = result.required_components.len(),
            "sanitizer run complete"
        );
        self.state = PipelineState::Done;
        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Parse `html`, run the configured pipeline with every diagnostic accepted
/// and return the result. Markup containing an `<html>` tag is treated as a
/// full document, anything else as a body fragment.
///
/// # Errors
///
/// Configuration errors (unknown passes, bad options, an external cache
/// requested without a store) and any error of [`Pipeline::run`].
pub fn sanitize_html(html: &str, config: &SanitizerConfig) -> PipelineResult<SanitizeResult> {
    let mut document = if html.to_ascii_lowercase().contains("<html") {
        Document::parse_document(html)
    } else {
        Document::parse_fragment(html)
    };
    let cache = Arc::new(CachePool::from_config(config, None)?);
    let mut pipeline = Pipeline::from_config(config, &PassContext::new(cache))?;
    pipeline.run(&mut document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::dom::{Element, NodeData};

    struct Panicking;

    impl Sanitizer for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn sanitize(
            &mut self,
            _document: &mut Document,
            _recorder: &mut DiagnosticRecorder<'_>,
        ) -> PipelineResult<PassOutput> {
            panic!("boom");
        }
    }

    struct Failing;

    impl Sanitizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn sanitize(
            &mut self,
            _document: &mut Document,
            _recorder: &mut DiagnosticRecorder<'_>,
        ) -> PipelineResult<PassOutput> {
            Err(anyhow::anyhow!("no network").into())
        }
    }

    struct Components(&'static str);

    impl Sanitizer for Components {
        fn name(&self) -> &str {
            self.0
        }

        fn sanitize(
            &mut self,
            document: &mut Document,
            _recorder: &mut DiagnosticRecorder<'_>,
        ) -> PipelineResult<PassOutput> {
            let node = document.create_element(Element::new(self.0));
            document.append_child(document.root(), node);
            let mut output = PassOutput::default();
            output.components.insert(self.0.to_string());
            output.stylesheets.push(format!("{}{{}}", self.0));
            Ok(output)
        }
    }

    #[test]
    fn test_outputs_merge_in_pass_order() {
        let mut pipeline = Pipeline::new(vec![
            Box::new(Components("amp-b")),
            Box::new(Components("amp-a")),
        ]);
        let mut doc = Document::parse_fragment("");
        let result = pipeline.run(&mut doc).expect("run");
        assert_eq!(result.serialized_markup, "<amp-b></amp-b><amp-a></amp-a>");
        assert_eq!(result.stylesheets, vec!["amp-b{}", "amp-a{}"]);
        assert_eq!(result.required_components.len(), 2);
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[test]
    fn test_panicking_pass_aborts_run() {
        let mut pipeline = Pipeline::new(vec![Box::new(Components("amp-a")), Box::new(Panicking)]);
        let mut doc = Document::parse_fragment("<p>x</p>");
        let err = pipeline.run(&mut doc).unwrap_err();
        assert!(matches!(err, SanitizeError::PassPanicked { ref pass, ref message } if pass == "panicking" && message == "boom"));
        assert_eq!(pipeline.state(), PipelineState::Running(1));
        // Mutations of earlier passes are not rolled back.
        assert_eq!(doc.to_html(), "<p>x</p><amp-a></amp-a>");
    }

    #[test]
    fn test_failing_pass_is_attributed() {
        let mut pipeline = Pipeline::new(vec![Box::new(Failing)]);
        let mut doc = Document::parse_fragment("<p>x</p>");
        let err = pipeline.run(&mut doc).unwrap_err();
        assert_eq!(err.pass_name(), Some("failing"));
        assert!(err.to_string().contains("no network"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let tree = ego_tree::Tree::new(NodeData::Text("loose".into()));
        let mut doc = Document::from(tree);
        let mut pipeline = Pipeline::new(Vec::new());
        assert!(matches!(
            pipeline.run(&mut doc),
            Err(SanitizeError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_sanitize_html_with_default_config() {
        let result = sanitize_html(
            r#"<style>.a{color:red}.b{color:blue}</style><p class="a">x</p><img src="i.jpg" width="10" height="10">"#,
            &SanitizerConfig::default(),
        )
        .expect("run");
        assert_eq!(
            result.serialized_markup,
            r#"<p class="a">x</p><amp-img src="i.jpg" width="10" height="10" layout="intrinsic"></amp-img>"#
        );
        assert_eq!(result.stylesheets, vec![".a{color:red}".to_string()]);
        let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::DisallowedTag, DiagnosticCode::DisallowedTag]
        );
        assert_eq!(result.diagnostics[0].source, "img");
        assert_eq!(result.diagnostics[1].source, "style");
    }
}
