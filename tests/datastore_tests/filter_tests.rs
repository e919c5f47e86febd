//! Tests for Datastore::filter
//!
//! These tests verify:
//! - Count and select share the predicate and parameters
//! - Sort field resolution (column vs payload path)
//! - Window defaults and the paginate opt-out
//! - Pager attachment
//! - Failure handling (no partial results)

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{setup_backend, MemoryBackend};
use docstore::{
    Config, Datastore, Document, DocstoreError, FilterOpts, Operation, Pager, SqlValue,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (Arc<MemoryBackend>, Datastore) {
    let (memory, backend) = setup_backend();
    let store = Datastore::open("items", backend).unwrap();
    (memory, store)
}

/// `count` documents tagged `collection`, with payload `n` = 0..count
fn seed(store: &Datastore, collection: &str, count: i64) {
    for n in 0..count {
        let mut doc = Document::new(collection).with("n", n).with("group", n % 2);
        store.create(&mut doc).unwrap();
    }
}

fn last_select(memory: &MemoryBackend) -> String {
    memory
        .statements_starting("SELECT id, collection")
        .last()
        .map(|s| s.sql.clone())
        .unwrap()
}

// =============================================================================
// Predicate Tests
// =============================================================================

#[test]
fn test_filter_scopes_by_predicate() {
    let (_memory, store) = setup_store();
    seed(&store, "items", 4);
    seed(&store, "other", 3);

    let result = store
        .filter(
            FilterOpts::new()
                .predicate("collection = :c")
                .param("c", "items"),
        )
        .unwrap();

    assert_eq!(result.total, 4);
    assert_eq!(result.hits.len(), 4);
    assert!(result.hits.iter().all(|d| d.collection == "items"));
}

#[test]
fn test_empty_predicate_scans_whole_table() {
    let (memory, store) = setup_store();
    seed(&store, "items", 2);
    seed(&store, "other", 2);

    let result = store.filter(FilterOpts::new().predicate("   ")).unwrap();

    assert_eq!(result.total, 4);
    assert!(!last_select(&memory).contains("WHERE"));
}

#[test]
fn test_count_and_select_share_bound_parameters() {
    let (memory, store) = setup_store();
    seed(&store, "items", 3);
    memory.clear_log();

    store
        .filter(
            FilterOpts::new()
                .predicate(" collection = :c AND payload->>'group' = :g ")
                .param("c", "items")
                .param("g", "1"),
        )
        .unwrap();

    let statements = memory.statements();
    assert_eq!(statements.len(), 2);

    let count = &statements[0];
    let select = &statements[1];
    assert_eq!(
        count.sql,
        "SELECT count(id) AS total FROM \"items\" WHERE (collection = $1 AND payload->>'group' = $2)"
    );
    assert!(select.sql.contains(" WHERE (collection = $1 AND payload->>'group' = $2)"));
    assert_eq!(
        count.params,
        vec![SqlValue::Text("items".to_string()), SqlValue::Text("1".to_string())]
    );
    assert_eq!(count.params, select.params);
}

#[test]
fn test_missing_parameter_fails_before_round_trip() {
    let (memory, store) = setup_store();
    memory.clear_log();

    let err = store
        .filter(FilterOpts::new().predicate("collection = :c"))
        .unwrap_err();

    assert!(matches!(err, DocstoreError::MissingParameter(_)));
    assert!(memory.statements().is_empty());
}

// =============================================================================
// Sort Tests
// =============================================================================

#[test]
fn test_sort_by_reserved_field_uses_column() {
    let (memory, store) = setup_store();
    seed(&store, "items", 3);

    let result = store
        .filter(FilterOpts::new().order_by("created_at", "desc"))
        .unwrap();

    assert!(last_select(&memory).contains(" ORDER BY created_at DESC"));
    let created: Vec<i64> = result.hits.iter().map(|d| d.created_at).collect();
    let mut sorted = created.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(created, sorted);
}

#[test]
fn test_sort_by_payload_field_uses_path() {
    let (memory, store) = setup_store();
    seed(&store, "items", 5);

    let result = store
        .filter(FilterOpts::new().order_by("n", "desc"))
        .unwrap();

    assert!(last_select(&memory).contains(" ORDER BY payload->>'n' DESC"));
    let ns: Vec<i64> = result
        .hits
        .iter()
        .map(|d| d.payload["n"].as_i64().unwrap())
        .collect();
    assert_eq!(ns, vec![4, 3, 2, 1, 0]);
}

#[test]
fn test_multiple_sorts_keep_order_and_case() {
    let (memory, store) = setup_store();
    seed(&store, "items", 1);

    store
        .filter(
            FilterOpts::new()
                .order_by("group", "Asc")
                .order_by("updated_at", "desc")
                .order_by("id", ""),
        )
        .unwrap();

    assert!(last_select(&memory)
        .contains(" ORDER BY payload->>'group' ASC, updated_at DESC, id LIMIT 10 OFFSET 0"));
}

#[test]
fn test_invalid_direction_is_passed_through() {
    let (memory, store) = setup_store();

    store
        .filter(FilterOpts::new().order_by("n", "sideways"))
        .unwrap();

    assert!(last_select(&memory).contains("payload->>'n' SIDEWAYS"));
}

// =============================================================================
// Pagination Tests
// =============================================================================

#[test]
fn test_limit_defaults_to_ten() {
    let (memory, store) = setup_store();
    seed(&store, "items", 25);

    let result = store.filter(FilterOpts::new().limit(0)).unwrap();

    assert_eq!(result.total, 25);
    assert_eq!(result.hits.len(), 10);
    assert!(last_select(&memory).ends_with(" LIMIT 10 OFFSET 0"));
    assert_eq!(result.pager, Pager::compute(25, 10, 0));
}

#[test]
fn test_configured_default_limit() {
    let (_memory, backend) = setup_backend();
    let config = Config::builder().default_limit(4).build();
    let store = Datastore::open_with_config("items", backend, &config).unwrap();
    seed(&store, "items", 9);

    let result = store.filter(FilterOpts::new()).unwrap();

    assert_eq!(result.hits.len(), 4);
    assert_eq!(result.pager.pages, 3);
}

#[test]
fn test_last_page_window_and_pager() {
    let (_memory, store) = setup_store();
    seed(&store, "items", 25);

    let result = store
        .filter(FilterOpts::new().order_by("created_at", "asc").limit(10).offset(20))
        .unwrap();

    assert_eq!(result.total, 25);
    assert_eq!(result.hits.len(), 5);
    assert_eq!(
        result.pager,
        Pager {
            pages: 3,
            current: 3,
            next: -1,
            prev: 2
        }
    );
}

#[test]
fn test_offset_from_page() {
    let (_memory, store) = setup_store();
    seed(&store, "items", 25);

    let mut opts = FilterOpts::new().limit(10);
    opts.offset_from_page(2, store.default_limit());
    let result = store.filter(opts).unwrap();

    assert_eq!(result.hits.len(), 10);
    assert_eq!(result.pager.current, 2);
    assert_eq!(result.pager.next, 3);
    assert_eq!(result.pager.prev, 1);
}

#[test]
fn test_paginate_false_returns_everything() {
    let (memory, store) = setup_store();
    seed(&store, "items", 25);

    let result = store
        .filter(FilterOpts::new().limit(3).offset(7).paginate(false))
        .unwrap();

    assert_eq!(result.total, 25);
    assert_eq!(result.hits.len(), 25);
    assert_eq!(result.pager, Pager::default());

    let sql = last_select(&memory);
    assert!(!sql.contains("LIMIT"));
    assert!(!sql.contains("OFFSET"));
}

#[test]
fn test_empty_result_pager() {
    let (_memory, store) = setup_store();

    let result = store.filter(FilterOpts::new()).unwrap();

    assert_eq!(result.total, 0);
    assert!(result.hits.is_empty());
    assert_eq!(
        result.pager,
        Pager {
            pages: 0,
            current: 1,
            next: -1,
            prev: -1
        }
    );
}

#[test]
fn test_offset_near_max_yields_empty_page() {
    let (_memory, store) = setup_store();
    seed(&store, "items", 5);

    let result = store
        .filter(FilterOpts::new().limit(1).offset(i64::MAX))
        .unwrap();

    assert_eq!(result.total, 5);
    assert!(result.hits.is_empty());
    assert_eq!(result.pager.current, i64::MAX);
    assert!(!result.pager.has_next());

    let mut opts = FilterOpts::new().limit(10);
    opts.offset_from_page(i64::MAX, store.default_limit());
    let result = store.filter(opts).unwrap();
    assert!(result.hits.is_empty());
    assert_eq!(result.pager.next, -1);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_count_failure_aborts_filter() {
    let (memory, store) = setup_store();
    seed(&store, "items", 3);
    memory.fail_when("count(id)");
    memory.clear_log();

    let err = store.filter(FilterOpts::new()).unwrap_err();

    assert!(matches!(err, DocstoreError::Storage { op: Operation::Count, .. }));
    assert!(memory.statements_starting("SELECT id, collection").is_empty());
}

#[test]
fn test_select_failure_aborts_filter() {
    let (memory, store) = setup_store();
    seed(&store, "items", 3);
    memory.fail_when("SELECT id, collection");

    let err = store.filter(FilterOpts::new()).unwrap_err();

    assert!(matches!(err, DocstoreError::Storage { op: Operation::Filter, .. }));
}
