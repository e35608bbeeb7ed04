//! Diagnostic record types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dom::NodeId;

/// Compliance problem codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    DisallowedTag,
    DisallowedAttribute,
    InvalidAttributeValue,
    DuplicateDimension,
    MutuallyExclusiveAttrs,
    MissingRequiredAttribute,
    StylesheetTooLong,
    KeyframesTooLong,
    DisallowedCssProperty,
    IllegalCssImportant,
    CssSyntaxError,
}

impl DiagnosticCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DisallowedTag => "disallowed-tag",
            DiagnosticCode::DisallowedAttribute => "disallowed-attribute",
            DiagnosticCode::InvalidAttributeValue => "invalid-attribute-value",
            DiagnosticCode::DuplicateDimension => "duplicate-dimension",
            DiagnosticCode::MutuallyExclusiveAttrs => "mutually-exclusive-attrs",
            DiagnosticCode::MissingRequiredAttribute => "missing-required-attribute",
            DiagnosticCode::StylesheetTooLong => "stylesheet-too-long",
            DiagnosticCode::KeyframesTooLong => "keyframes-too-long",
            DiagnosticCode::DisallowedCssProperty => "disallowed-css-property",
            DiagnosticCode::IllegalCssImportant => "illegal-css-important",
            DiagnosticCode::CssSyntaxError => "css-syntax-error",
        }
    }

    /// Severity of every diagnostic raised with this code.
    #[must_use]
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::DuplicateDimension | DiagnosticCode::IllegalCssImportant => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Outcome of offering a diagnostic to the caller's callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the mutation the diagnostic describes.
    Accept,
    /// Leave the offending markup as it is.
    Reject,
}

impl Decision {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// One compliance decision, attributed to the pass and node it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Arena handle of the node involved. Stays valid after the node is
    /// detached; not serialized since it only means something for the
    /// document it came from.
    #[serde(skip)]
    pub node: Option<NodeId>,
    pub node_name: Option<String>,
    pub attribute: Option<String>,
    /// Offending value, selector or at-rule, depending on the code.
    pub detail: Option<String>,
    /// Pass that raised the diagnostic; filled in by the recorder.
    pub source: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            node: None,
            node_name: None,
            attribute: None,
            detail: None,
            source: String::new(),
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: NodeId, name: impl Into<String>) -> Self {
        self.node = Some(node);
        self.node_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.code)?;
        if let Some(name) = &self.node_name {
            write!(f, " <{name}>")?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, " @{attribute}")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
