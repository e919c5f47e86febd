//! Tests for the datastore Manager
//!
//! These tests verify:
//! - One datastore per name, reused across calls
//! - Concurrent first lookups bootstrap exactly once
//! - Failed bootstraps are not cached
//! - Name validation

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{init_tracing, setup_backend};
use docstore::{Config, Datastore, Document, DocstoreError, Manager, Operation};

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_returns_same_instance() {
    let (memory, backend) = setup_backend();
    let manager = Manager::new(backend);

    let a = manager.get("posts").unwrap();
    let b = manager.get("posts").unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(memory.statements_starting("CREATE TABLE").len(), 1);
}

#[test]
fn test_distinct_names_get_distinct_datastores() {
    let (memory, backend) = setup_backend();
    let manager = Manager::new(backend);

    let posts = manager.get("posts").unwrap();
    let users = manager.get("users").unwrap();

    assert!(!Arc::ptr_eq(&posts, &users));
    assert_eq!(posts.name(), "posts");
    assert_eq!(users.name(), "users");
    assert_eq!(memory.statements_starting("CREATE TABLE").len(), 2);
}

#[test]
fn test_datastores_share_backend_data() {
    let (_memory, backend) = setup_backend();
    let manager = Manager::new(backend);

    let mut doc = Document::new("posts").with("title", "hello");
    manager.get("posts").unwrap().create(&mut doc).unwrap();

    let fetched = manager.get("posts").unwrap().get(&doc.id).unwrap();
    assert_eq!(fetched.payload["title"], "hello");
}

#[test]
fn test_config_flows_to_datastores() {
    let (_memory, backend) = setup_backend();
    let config = Config::builder().default_limit(25).build();
    let manager = Manager::with_config(backend, config);

    assert_eq!(manager.get("posts").unwrap().default_limit(), 25);
    assert_eq!(manager.config().default_limit, 25);
}

// =============================================================================
// Registry State Tests
// =============================================================================

#[test]
fn test_len_contains_and_names() {
    let (_memory, backend) = setup_backend();
    let manager = Manager::new(backend);

    assert!(manager.is_empty());
    assert!(!manager.contains("posts"));

    manager.get("users").unwrap();
    manager.get("posts").unwrap();
    manager.get("posts").unwrap();

    assert_eq!(manager.len(), 2);
    assert!(manager.contains("posts"));
    assert!(!manager.contains("pages"));
    assert_eq!(manager.names(), vec!["posts".to_string(), "users".to_string()]);
}

#[test]
fn test_invalid_name_is_rejected() {
    let (memory, backend) = setup_backend();
    let manager = Manager::new(backend);

    let err = manager.get("bad name").unwrap_err();

    assert!(matches!(err, DocstoreError::InvalidCollectionName(_)));
    assert!(memory.statements().is_empty());
    assert!(manager.is_empty());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_bootstrap_is_not_cached() {
    init_tracing();
    let (memory, backend) = setup_backend();
    let manager = Manager::new(backend);
    memory.fail_when("CREATE TABLE");

    let err = manager.get("posts").unwrap_err();
    assert!(matches!(err, DocstoreError::Storage { op: Operation::Bootstrap, .. }));
    assert!(!manager.contains("posts"));
    assert_eq!(manager.len(), 0);

    memory.stop_failing();

    let store = manager.get("posts").unwrap();
    assert_eq!(store.name(), "posts");
    assert!(manager.contains("posts"));
    assert_eq!(memory.statements_starting("CREATE TABLE").len(), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_first_get_bootstraps_once() {
    init_tracing();
    let (memory, backend) = setup_backend();
    memory.slow_ddl(50);
    let manager = Manager::new(backend);

    let stores: Vec<Arc<Datastore>> = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| s.spawn(|_| manager.get("posts").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(stores.len(), 16);
    for store in &stores[1..] {
        assert!(Arc::ptr_eq(&stores[0], store));
    }
    assert_eq!(memory.statements_starting("CREATE TABLE").len(), 1);
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_concurrent_gets_for_many_names() {
    let (memory, backend) = setup_backend();
    let manager = Manager::new(backend);
    let names = ["a", "b", "c", "d"];

    crossbeam::thread::scope(|s| {
        for t in 0..8 {
            let manager = &manager;
            s.spawn(move |_| {
                for i in 0..names.len() {
                    let name = names[(t + i) % names.len()];
                    assert_eq!(manager.get(name).unwrap().name(), name);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(manager.len(), 4);
    assert_eq!(memory.statements_starting("CREATE TABLE").len(), 4);
}
