//! Capacity behaviour of the local and external cache backends

use kodegen_tools_amp_sanitizer::{CachePool, SanitizerConfig, SharedMapStore, sanitize_html};
use std::sync::Arc;

mod common;

#[test]
fn test_local_pool_evicts_oldest_entry() {
    let pool = CachePool::local(3).expect("valid capacity");
    for i in 0..4 {
        pool.set("style-element", &format!("k{i}"), vec![i as u8]);
    }

    assert_eq!(pool.get("style-element", "k0"), None);
    for i in 1..4 {
        assert_eq!(pool.get("style-element", &format!("k{i}")), Some(vec![i as u8]));
    }
    assert_eq!(pool.group_len("style-element"), Some(3));
    assert_eq!(pool.stats().evictions, 1);
}

#[test]
fn test_groups_are_bounded_independently() {
    let pool = CachePool::local(2).expect("valid capacity");
    pool.set("inline-style", "a", b"1".to_vec());
    pool.set("style-element", "a", b"2".to_vec());
    pool.set("style-element", "b", b"3".to_vec());
    pool.set("style-element", "c", b"4".to_vec());

    assert_eq!(pool.get("inline-style", "a"), Some(b"1".to_vec()));
    assert_eq!(pool.get("style-element", "a"), None);
    assert_eq!(pool.group_len("inline-style"), Some(1));
}

#[test]
fn test_external_pool_has_no_bound() {
    let store = Arc::new(SharedMapStore::new());
    let pool = CachePool::external(store.clone());
    for i in 0..200 {
        pool.set("style-element", &format!("k{i}"), vec![1]);
    }

    assert!(!pool.is_bounded());
    assert_eq!(pool.capacity(), None);
    assert_eq!(store.len(), 200);
    assert_eq!(pool.get("style-element", "k0"), Some(vec![1]));
    assert_eq!(pool.stats().evictions, 0);
}

#[test]
fn test_external_flag_without_store_is_a_config_error() {
    let config = SanitizerConfig::builder()
        .use_external_cache(true)
        .build()
        .expect("valid config");
    let err = sanitize_html("<p>x</p>", &config).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_runs_reuse_parsed_stylesheets() {
    let config = SanitizerConfig::default();
    let pool = Arc::new(CachePool::from_config(&config, None).expect("local cache"));
    let context = kodegen_tools_amp_sanitizer::PassContext::new(Arc::clone(&pool));
    let html = "<style>p{color:red}</style><p>x</p>";

    for _ in 0..2 {
        let mut pipeline = kodegen_tools_amp_sanitizer::Pipeline::from_config(&config, &context)
            .expect("default passes");
        let mut doc = kodegen_tools_amp_sanitizer::Document::parse_fragment(html);
        let result = pipeline.run(&mut doc).expect("run");
        assert_eq!(result.stylesheets, vec!["p{color:red}".to_string()]);
    }
    assert!(pool.stats().hits >= 1);
}
