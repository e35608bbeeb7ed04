//! JSON loading and derived settings for `SanitizerConfig`

use super::builder::validate;
use super::types::SanitizerConfig;
use crate::pipeline::{PipelineResult, SanitizeError};

impl SanitizerConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError::Config`] for malformed JSON, wrongly typed
    /// fields, or values the builder would reject.
    ///
    /// # Example
    /// ```rust
    /// # use kodegen_tools_amp_sanitizer::config::SanitizerConfig;
    /// let config = SanitizerConfig::from_json(
    ///     r#"{"cache_capacity": 10, "passes": [{"name": "tag-and-attribute", "options": {"strict": true}}]}"#,
    /// ).unwrap();
    /// assert_eq!(config.cache_capacity(), 10);
    /// assert_eq!(config.passes().len(), 1);
    /// ```
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let config: SanitizerConfig = serde_json::from_str(json)?;
        validate(&config).map_err(|e| SanitizeError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Serialize back to JSON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization of the option maps fails.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy of this configuration without the named pass.
    #[must_use]
    pub fn without_pass(mut self, name: &str) -> Self {
        self.passes.retain(|pass| pass.name != name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassConfig;
    use crate::utils::DEFAULT_PASS_ORDER;

    #[test]
    fn test_defaults() {
        let config = SanitizerConfig::default();
        assert_eq!(config.stylesheet_max_bytes(), 75_000);
        assert_eq!(config.keyframes_max_bytes(), 500_000);
        assert_eq!(config.cache_capacity(), 50);
        assert!(!config.use_external_cache());
        let names: Vec<_> = config.passes().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, DEFAULT_PASS_ORDER);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SanitizerConfig::from_json(r#"{"stylesheet_max_bytes": 1000}"#)
            .expect("valid json");
        assert_eq!(config.stylesheet_max_bytes(), 1000);
        assert_eq!(config.cache_capacity(), 50);
        assert_eq!(config.passes().len(), 4);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let err = SanitizerConfig::from_json(r#"{"cache_capacity": 0}"#).unwrap_err();
        assert!(err.is_configuration_error());
        let err = SanitizerConfig::from_json(r#"{"cache_capacity": "ten"}"#).unwrap_err();
        assert!(matches!(err, SanitizeError::Config(_)));
    }

    #[test]
    fn test_builder_and_round_trip() {
        let config = SanitizerConfig::builder()
            .cache_capacity(3)
            .passes(vec![PassConfig::new("style").with_option("max_bytes", 100)])
            .keyframes_property_allowlist([" Opacity "])
            .build()
            .expect("valid config");
        assert_eq!(config.keyframes_property_allowlist(), ["opacity".to_string()]);
        let json = config.to_json().expect("serializable");
        assert_eq!(SanitizerConfig::from_json(&json).expect("valid json"), config);
        assert!(SanitizerConfig::builder().cache_capacity(0).build().is_err());
    }

    #[test]
    fn test_without_pass() {
        let config = SanitizerConfig::default().without_pass("img");
        assert!(config.pass("img").is_none());
        assert!(config.pass("style").is_some());
    }
}
