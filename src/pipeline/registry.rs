//! Pass registry: turns `PassConfig` entries into pass instances

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use super::{PipelineResult, SanitizeError, Sanitizer};
use crate::cache::CachePool;
use crate::config::{PassConfig, SanitizerConfig};
use crate::css::{StyleOptions, StyleSanitizer};
use crate::layout::LayoutMode;
use crate::passes::{DevModeSanitizer, DimensionProvider, ImgSanitizer};
use crate::spec::SpecTable;
use crate::validator::TagAndAttributeSanitizer;

/// Names accepted in `PassConfig::name`
pub const REGISTERED_PASSES: &[&str] = &[
    DevModeSanitizer::NAME,
    ImgSanitizer::NAME,
    TagAndAttributeSanitizer::NAME,
    StyleSanitizer::NAME,
];

/// Collaborators shared by the passes of one pipeline
#[derive(Clone)]
pub struct PassContext {
    pub cache: Arc<CachePool>,
    pub table: &'static SpecTable,
    pub dimension_provider: Option<Arc<dyn DimensionProvider>>,
}

impl PassContext {
    pub fn new(cache: Arc<CachePool>) -> Self {
        Self {
            cache,
            table: SpecTable::builtin(),
            dimension_provider: None,
        }
    }

    #[must_use]
    pub fn with_dimension_provider(mut self, provider: Arc<dyn DimensionProvider>) -> Self {
        self.dimension_provider = Some(provider);
        self
    }
}

/// Instantiate one configured pass.
///
/// # Errors
///
/// [`SanitizeError::UnknownPass`] for unregistered names and
/// [`SanitizeError::InvalidPassOption`] for options of the wrong type or
/// with unusable values.
pub fn build_pass(
    pass: &PassConfig,
    config: &SanitizerConfig,
    context: &PassContext,
) -> PipelineResult<Box<dyn Sanitizer>> {
    let options = Options {
        pass: &pass.name,
        map: &pass.options,
    };

    match pass.name.as_str() {
        DevModeSanitizer::NAME => {
            options.warn_unknown(&["selectors"]);
            let selectors = options.strings("selectors")?.unwrap_or_default();
            Ok(Box::new(DevModeSanitizer::new(&selectors)))
        }
        ImgSanitizer::NAME => {
            options.warn_unknown(&["fallback_layout"]);
            let fallback_layout = options
                .string("fallback_layout")?
                .map(|value| {
                    value
                        .parse::<LayoutMode>()
                        .map_err(|message| options.invalid("fallback_layout", message))
                })
                .transpose()?;
            let mut img = ImgSanitizer::new().with_fallback_layout(fallback_layout);
            if let Some(provider) = &context.dimension_provider {
                img = img.with_provider(Arc::clone(provider));
            }
            Ok(Box::new(img))
        }
        TagAndAttributeSanitizer::NAME => {
            options.warn_unknown(&["strict"]);
            let strict = options.bool("strict")?.unwrap_or(false);
            Ok(Box::new(
                TagAndAttributeSanitizer::new(context.table).strict(strict),
            ))
        }
        StyleSanitizer::NAME => {
            options.warn_unknown(&[
                "property_allowlist",
                "max_bytes",
                "keyframes_max_bytes",
                "convert_inline_styles",
            ]);
            let style = StyleOptions {
                max_bytes: options
                    .usize("max_bytes")?
                    .unwrap_or(config.stylesheet_max_bytes()),
                keyframes_max_bytes: options
                    .usize("keyframes_max_bytes")?
                    .unwrap_or(config.keyframes_max_bytes()),
                keyframes_property_allowlist: options
                    .strings("property_allowlist")?
                    .map(|list| list.into_iter().map(|p| p.trim().to_ascii_lowercase()).collect())
                    .unwrap_or_else(|| config.keyframes_property_allowlist().to_vec()),
                convert_inline_styles: options.bool("convert_inline_styles")?.unwrap_or(true),
            };
            Ok(Box::new(StyleSanitizer::new(Arc::clone(&context.cache), style)))
        }
        other => Err(SanitizeError::UnknownPass(other.to_string())),
    }
}

/// Typed access to one pass's option map
struct Options<'a> {
    pass: &'a str,
    map: &'a Map<String, Value>,
}

impl Options<'_> {
    fn invalid(&self, option: &str, message: impl Into<String>) -> SanitizeError {
        SanitizeError::InvalidPassOption {
            pass: self.pass.to_string(),
            option: option.to_string(),
            message: message.into(),
        }
    }

    fn warn_unknown(&self, known: &[&str]) {
        for key in self.map.keys() {
            if !known.contains(&key.as_str()) {
                warn!(pass = self.pass, option = %key, "ignoring unknown pass option");
            }
        }
    }

    fn bool(&self, key: &str) -> PipelineResult<Option<bool>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(self.invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    fn usize(&self, key: &str) -> PipelineResult<Option<usize>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected a non-negative integer, got {number}"))),
            Some(other) => Err(self.invalid(key, format!("expected an integer, got {other}"))),
        }
    }

    fn string(&self, key: &str) -> PipelineResult<Option<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {other}"))),
        }
    }

    fn strings(&self, key: &str) -> PipelineResult<Option<Vec<String>>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(value) => Ok(value.clone()),
                    other => Err(self.invalid(key, format!("expected strings, got {other}"))),
                })
                .collect::<PipelineResult<Vec<_>>>()
                .map(Some),
            Some(other) => Err(self.invalid(key, format!("expected a list of strings, got {other}"))),
        }
    }
}
