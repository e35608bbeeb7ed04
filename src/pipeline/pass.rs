use std::collections::BTreeSet;

use super::PipelineResult;
use crate::diagnostics::DiagnosticRecorder;
use crate::dom::Document;

/// One transformation pass over the shared document.
///
/// Passes communicate only through the document and the [`PassOutput`]
/// they return. Compliance problems go through the recorder; an `Err` is
/// reserved for structural failures and aborts the run.
pub trait Sanitizer: Send {
    /// Registry name, also used to attribute diagnostics.
    fn name(&self) -> &str;

    fn sanitize(
        &mut self,
        document: &mut Document,
        recorder: &mut DiagnosticRecorder<'_>,
    ) -> PipelineResult<PassOutput>;
}

/// Side outputs of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutput {
    /// Runtime components required by surviving markup.
    pub components: BTreeSet<String>,
    /// Stylesheet fragments for `style[amp-custom]`.
    pub stylesheets: Vec<String>,
    /// Keyframes residue for `style[amp-keyframes]`.
    pub keyframes: Vec<String>,
}

impl PassOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.stylesheets.is_empty() && self.keyframes.is_empty()
    }
}
