//! Configuration module for sanitizer runs
//!
//! This module provides the `SanitizerConfig` struct, its builder and JSON
//! loading, plus the per-pass `PassConfig` entries.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::SanitizerConfigBuilder;
pub use types::{PassConfig, SanitizerConfig};
