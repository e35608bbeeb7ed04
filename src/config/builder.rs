//! Fluent builder for `SanitizerConfig`
//!
//! Every setter is infallible; `build()` checks the combined values once.

use anyhow::{Result, anyhow, bail};

use super::types::{PassConfig, SanitizerConfig};

pub struct SanitizerConfigBuilder {
    config: SanitizerConfig,
}

impl SanitizerConfig {
    /// Create a builder starting from the default configuration
    #[must_use]
    pub fn builder() -> SanitizerConfigBuilder {
        SanitizerConfigBuilder {
            config: SanitizerConfig::default(),
        }
    }
}

impl SanitizerConfigBuilder {
    #[must_use]
    pub fn stylesheet_max_bytes(mut self, bytes: usize) -> Self {
        self.config.stylesheet_max_bytes = bytes;
        self
    }

    #[must_use]
    pub fn keyframes_max_bytes(mut self, bytes: usize) -> Self {
        self.config.keyframes_max_bytes = bytes;
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Use the host-provided store instead of the local FIFO map. The store
    /// itself is handed to the cache pool at construction.
    #[must_use]
    pub fn use_external_cache(mut self, external: bool) -> Self {
        self.config.use_external_cache = external;
        self
    }

    /// Replace the whole pass list.
    #[must_use]
    pub fn passes(mut self, passes: Vec<PassConfig>) -> Self {
        self.config.passes = passes;
        self
    }

    /// Append one pass to the list.
    #[must_use]
    pub fn pass(mut self, pass: PassConfig) -> Self {
        self.config.passes.push(pass);
        self
    }

    #[must_use]
    pub fn keyframes_property_allowlist<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keyframes_property_allowlist = properties
            .into_iter()
            .map(|p| p.into().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    ///
    /// Returns an error when the cache capacity is zero, a pass entry has
    /// an empty name, or the allow-list contains an empty property.
    pub fn build(self) -> Result<SanitizerConfig> {
        validate(&self.config)?;
        Ok(self.config)
    }
}

/// Checks shared by the builder and JSON loading.
pub(crate) fn validate(config: &SanitizerConfig) -> Result<()> {
    if config.cache_capacity == 0 {
        bail!("cache_capacity must be at least 1");
    }
    if let Some(index) = config.passes.iter().position(|p| p.name.trim().is_empty()) {
        return Err(anyhow!("pass #{index} has an empty name"));
    }
    if config
        .keyframes_property_allowlist
        .iter()
        .any(|p| p.trim().is_empty())
    {
        bail!("keyframes_property_allowlist contains an empty property");
    }
    Ok(())
}
