//! Core configuration types for sanitizer runs
//!
//! `SanitizerConfig` holds the budgets, cache settings and ordered pass
//! list a pipeline is built from. It deserializes from JSON because hosts
//! hand pass options over as JSON-like maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_KEYFRAMES_MAX_BYTES, DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST,
    DEFAULT_PASS_ORDER, DEFAULT_STYLESHEET_MAX_BYTES,
};

/// Main configuration struct for sanitizer runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Byte budget of the main `amp-custom` stylesheet.
    pub(crate) stylesheet_max_bytes: usize,
    /// Byte budget of the keyframes residue.
    pub(crate) keyframes_max_bytes: usize,

    /// Entries kept per cache group by the local FIFO backend.
    ///
    /// **INVARIANT:** at least 1 (checked by the builder and `from_json`).
    pub(crate) cache_capacity: usize,

    /// Delegate caching to a host store instead of the local FIFO map.
    pub(crate) use_external_cache: bool,

    /// Ordered pass list.
    pub(crate) passes: Vec<PassConfig>,

    /// Properties that let a keyframes block move to the residue. A
    /// `property_allowlist` option on the `style` pass overrides it.
    pub(crate) keyframes_property_allowlist: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            stylesheet_max_bytes: DEFAULT_STYLESHEET_MAX_BYTES,
            keyframes_max_bytes: DEFAULT_KEYFRAMES_MAX_BYTES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            use_external_cache: false,
            passes: DEFAULT_PASS_ORDER.iter().map(|name| PassConfig::new(*name)).collect(),
            keyframes_property_allowlist: DEFAULT_KEYFRAMES_PROPERTY_ALLOWLIST
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

/// One entry of the pass list: a registered pass name and its options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassConfig {
    pub name: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl PassConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}
