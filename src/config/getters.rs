//! Getter methods for `SanitizerConfig`

use super::types::{PassConfig, SanitizerConfig};

impl SanitizerConfig {
    #[must_use]
    pub fn stylesheet_max_bytes(&self) -> usize {
        self.stylesheet_max_bytes
    }

    #[must_use]
    pub fn keyframes_max_bytes(&self) -> usize {
        self.keyframes_max_bytes
    }

    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    #[must_use]
    pub fn use_external_cache(&self) -> bool {
        self.use_external_cache
    }

    #[must_use]
    pub fn passes(&self) -> &[PassConfig] {
        &self.passes
    }

    #[must_use]
    pub fn keyframes_property_allowlist(&self) -> &[String] {
        &self.keyframes_property_allowlist
    }

    /// First configured entry for the named pass.
    #[must_use]
    pub fn pass(&self, name: &str) -> Option<&PassConfig> {
        self.passes.iter().find(|pass| pass.name == name)
    }
}
