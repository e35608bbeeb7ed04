//! Error types for pipeline runs
//!
//! Only structural problems surface here. Compliance problems (disallowed
//! tags, invalid values, oversized stylesheets...) never become errors; they
//! are resolved inside the passes and reported as diagnostics.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, SanitizeError>;

/// Fatal conditions that abort a pipeline run
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// The input tree violates a structural precondition
    #[error("Malformed input document: {0}")]
    MalformedDocument(String),

    /// A pass reported a failure
    #[error("Sanitizer pass '{pass}' failed: {message}")]
    PassFailed { pass: String, message: String },

    /// A pass panicked; the document may be partially mutated
    #[error("Sanitizer pass '{pass}' panicked: {message}")]
    PassPanicked { pass: String, message: String },

    /// A pass left the tree in a structurally invalid state
    #[error("Sanitizer pass '{pass}' corrupted the document: {reason}")]
    CorruptedByPass { pass: String, reason: String },

    /// No pass is registered under this name
    #[error("Unknown sanitizer pass '{0}'")]
    UnknownPass(String),

    /// A pass option had the wrong type or an out-of-range value
    #[error("Invalid option '{option}' for pass '{pass}': {message}")]
    InvalidPassOption {
        pass: String,
        option: String,
        message: String,
    },

    /// Invalid sanitizer configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Cache pool construction failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for SanitizeError {
    fn from(error: anyhow::Error) -> Self {
        SanitizeError::Other(error.to_string())
    }
}

impl From<serde_json::Error> for SanitizeError {
    fn from(error: serde_json::Error) -> Self {
        SanitizeError::Config(error.to_string())
    }
}

impl SanitizeError {
    /// Whether the error stems from configuration rather than a run
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SanitizeError::UnknownPass(_)
                | SanitizeError::InvalidPassOption { .. }
                | SanitizeError::Config(_)
                | SanitizeError::Cache(_)
        )
    }

    /// Name of the pass responsible, when known
    #[must_use]
    pub fn pass_name(&self) -> Option<&str> {
        match self {
            SanitizeError::PassFailed { pass, .. }
            | SanitizeError::PassPanicked { pass, .. }
            | SanitizeError::CorruptedByPass { pass, .. }
            | SanitizeError::InvalidPassOption { pass, .. } => Some(pass),
            SanitizeError::UnknownPass(name) => Some(name),
            _ => None,
        }
    }
}
