//! Test utilities shared by the amp-sanitizer integration tests

use kodegen_tools_amp_sanitizer::{
    Diagnostic, DiagnosticCode, SanitizeResult, SanitizerConfig, sanitize_html,
};

/// Install a tracing subscriber honouring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Run the default pipeline over `html`.
#[allow(dead_code)]
pub fn sanitize(html: &str) -> SanitizeResult {
    init_tracing();
    sanitize_html(html, &SanitizerConfig::default()).expect("default pipeline run")
}

#[allow(dead_code)]
pub fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

/// Wrap body markup in a minimal page.
#[allow(dead_code)]
pub fn page(head: &str, body: &str) -> String {
    format!("<!DOCTYPE html><html><head>{head}</head><body>{body}</body></html>")
}
