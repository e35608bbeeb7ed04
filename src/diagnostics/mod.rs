//! Diagnostic recording with caller-controlled acceptance
//!
//! Every compliance mutation a pass wants to make is first described as a
//! [`Diagnostic`] and offered to the caller's callback. Accepting means "go
//! ahead and fix it"; rejecting means "leave the markup as-is" (the dev-mode
//! / test-mode exemption). Without a callback everything is accepted.

mod types;

pub use types::{Decision, Diagnostic, DiagnosticCode, Severity};

use tracing::{debug, trace};

/// Caller-supplied accept/reject predicate
pub type DiagnosticCallback<'a> = Box<dyn FnMut(&Diagnostic) -> bool + 'a>;

/// Collects the diagnostics of one pipeline run
pub struct DiagnosticRecorder<'a> {
    callback: Option<DiagnosticCallback<'a>>,
    current_pass: String,
    accepted: Vec<Diagnostic>,
    rejected: Vec<Diagnostic>,
}

impl<'a> DiagnosticRecorder<'a> {
    /// Recorder that accepts every diagnostic.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            callback: None,
            current_pass: String::new(),
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn with_callback(callback: impl FnMut(&Diagnostic) -> bool + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..Self::accept_all()
        }
    }

    /// Attribute subsequent diagnostics to `pass`.
    pub fn set_pass(&mut self, pass: &str) {
        self.current_pass.clear();
        self.current_pass.push_str(pass);
    }

    #[must_use]
    pub fn current_pass(&self) -> &str {
        &self.current_pass
    }

    /// Offer a diagnostic to the callback and record the outcome.
    pub fn emit(&mut self, mut diagnostic: Diagnostic) -> Decision {
        diagnostic.source.clone_from(&self.current_pass);

        let accepted = match self.callback.as_mut() {
            Some(callback) => callback(&diagnostic),
            None => true,
        };

        if accepted {
            trace!(code = %diagnostic.code, pass = %diagnostic.source, "diagnostic accepted");
            self.accepted.push(diagnostic);
            Decision::Accept
        } else {
            debug!(
                code = %diagnostic.code,
                pass = %diagnostic.source,
                node = ?diagnostic.node_name,
                "diagnostic rejected, leaving markup untouched"
            );
            self.rejected.push(diagnostic);
            Decision::Reject
        }
    }

    /// Drain the accepted diagnostics recorded so far.
    pub fn take_accepted(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.accepted)
    }

    /// Drain the rejected diagnostics recorded so far.
    pub fn take_rejected(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.rejected)
    }

    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

impl Default for DiagnosticRecorder<'_> {
    fn default() -> Self {
        Self::accept_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_everything() {
        let mut recorder = DiagnosticRecorder::accept_all();
        recorder.set_pass("validator");
        let decision = recorder.emit(Diagnostic::new(DiagnosticCode::DisallowedTag));
        assert!(decision.is_accepted());
        let accepted = recorder.take_accepted();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].source, "validator");
    }

    #[test]
    fn test_callback_can_reject_by_code() {
        let mut seen = Vec::new();
        {
            let mut recorder = DiagnosticRecorder::with_callback(|d: &Diagnostic| {
                seen.push(d.code);
                d.code != DiagnosticCode::DisallowedAttribute
            });
            assert_eq!(
                recorder.emit(Diagnostic::new(DiagnosticCode::DisallowedAttribute)),
                Decision::Reject
            );
            assert_eq!(
                recorder.emit(Diagnostic::new(DiagnosticCode::DisallowedTag)),
                Decision::Accept
            );
            assert_eq!(recorder.take_rejected().len(), 1);
            assert_eq!(recorder.take_accepted().len(), 1);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_display_includes_context() {
        let mut recorder = DiagnosticRecorder::accept_all();
        recorder.set_pass("style");
        recorder.emit(
            Diagnostic::new(DiagnosticCode::StylesheetTooLong).with_detail(".big"),
        );
        let diagnostic = &recorder.take_accepted()[0];
        assert_eq!(diagnostic.to_string(), "[style] stylesheet-too-long: .big");
        assert_eq!(diagnostic.code.as_str(), "stylesheet-too-long");
    }
}
