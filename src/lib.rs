pub mod cache;
pub mod config;
pub mod css;
pub mod diagnostics;
pub mod dom;
pub mod layout;
pub mod passes;
pub mod pipeline;
pub mod spec;
pub mod utils;
pub mod validator;

pub use cache::{CachePool, CacheStats, ExternalStore, SharedMapStore};
pub use config::{PassConfig, SanitizerConfig};
pub use css::{StyleOptions, StyleSanitizer};
pub use diagnostics::{Decision, Diagnostic, DiagnosticCode, DiagnosticRecorder, Severity};
pub use dom::{Document, Element, NodeData, NodeId};
pub use layout::{LayoutDecision, LayoutMode};
pub use passes::{DevModeSanitizer, DimensionProvider, ImgSanitizer};
pub use pipeline::{
    PassContext, PassOutput, Pipeline, PipelineResult, PipelineState, SanitizeError,
    SanitizeResult, Sanitizer, sanitize_html,
};
pub use spec::{SpecRule, SpecTable};
pub use validator::{TagAndAttributeSanitizer, ValidationVerdict};
