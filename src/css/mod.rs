//! Stylesheet collection and tree-shaking
//!
//! Style sources (`<style>` elements and `style` attributes) are parsed into
//! a small rule model, memoized in the [`CachePool`] by content hash, and
//! filtered against the final document: rules no element matches are
//! dropped, keyframes restricted to an allow-listed property set move to a
//! separate residue, and both outputs are held to byte budgets.

mod collector;
mod declarations;
mod parser;
mod rules;
mod selector;
mod shaker;

pub use collector::{StyleOptions, StyleSanitizer};
pub use declarations::{Declaration, parse_declarations, serialize_declarations};
pub use parser::parse_stylesheet;
pub use rules::{
    ConditionalRule, CssRule, KeyframesRule, OtherAtRule, ParsedStylesheet, StyleRule,
};
pub use selector::{Combinator, Compound, DocumentIndex, Selector};
pub use shaker::{ShakeOutcome, SourcedRule, enforce_budget, shake};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::CachePool;

/// Hex xxh3 digest of a style source, used as cache key and class suffix.
#[must_use]
pub fn content_hash(source: &str) -> String {
    format!("{:016x}", xxh3_64(source.as_bytes()))
}

/// Parse `source` through the cache. Entries that fail to decode are
/// treated as misses and overwritten.
pub(crate) fn cached<T, F>(cache: &CachePool, group: &str, source: &str, parse: F) -> T
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&str) -> T,
{
    let key = content_hash(source);
    if let Some(bytes) = cache.get(group, &key) {
        match serde_json::from_slice(&bytes) {
            Ok(value) => return value,
            Err(e) => warn!(group, key = %key, error = %e, "discarding undecodable cache entry"),
        }
    }

    let value = parse(source);
    match serde_json::to_vec(&value) {
        Ok(bytes) => cache.set(group, &key, bytes),
        Err(e) => warn!(group, error = %e, "parse result not cacheable"),
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_parse_is_reused() {
        let cache = CachePool::local(4).expect("valid capacity");
        let first: ParsedStylesheet = cached(&cache, "g", "a{color:red}", parse_stylesheet);
        let second: ParsedStylesheet =
            cached(&cache, "g", "a{color:red}", |_| ParsedStylesheet::default());
        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("color:red"), content_hash("color:red"));
        assert_ne!(content_hash("color:red"), content_hash("color:blue"));
        assert_eq!(content_hash("x").len(), 16);
    }
}
