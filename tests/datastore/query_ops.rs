//! Query tests.

use crate::*;
use std::collections::BTreeSet;

// =============================================================================
// PREFIX SCANS
// =============================================================================

#[tokio::test]
async fn test_keys_only_prefix_scan() {
    let ds = create_ephemeral();
    populate(&ds, &[("a/1", "x"), ("a/2", "y"), ("b/1", "z")]);

    let entries = ds
        .query(Query::new().prefix("a/").keys_only(true))
        .unwrap()
        .rest()
        .await
        .unwrap();

    assert_eq!(keys_of(&entries), vec!["/a/1", "/a/2"]);
    for entry in &entries {
        assert_eq!(entry.value, None);
        assert_eq!(entry.size, 0);
    }
}

#[tokio::test]
async fn test_limit_one_over_three_keys() {
    let ds = create_ephemeral();
    populate(&ds, &[("a/1", "x"), ("a/2", "y"), ("a/3", "z")]);

    let mut results = ds.query(Query::new().prefix("a").limit(1)).unwrap();

    let first = results.next().await.unwrap().unwrap();
    assert_eq!(first.key, Key::new("/a/1"));
    assert!(results.next().await.is_none());
    results.close().await.unwrap();
}

#[tokio::test]
async fn test_root_prefix_matches_everything() {
    let (ds, _dir) = create_on_disk();
    populate(&ds, &[("a", "1"), ("b/c", "2"), ("d/e/f", "3")]);

    for prefix in ["", "/"] {
        let entries = ds
            .query(Query::new().prefix(prefix))
            .unwrap()
            .rest()
            .await
            .unwrap();
        assert_eq!(keys_of(&entries), vec!["/a", "/b/c", "/d/e/f"]);
    }
}

#[tokio::test]
async fn test_prefix_scan_is_complete() {
    let (ds, _dir) = create_on_disk();
    let mut expected = BTreeSet::new();
    for i in 0..600 {
        let key = format!("/items/{:05}", i);
        ds.put(&Key::new(&key), format!("v{}", i).as_bytes()).unwrap();
        expected.insert(key);
    }
    populate(&ds, &[("itemsx/0", "no"), ("other/1", "no")]);

    let entries = ds
        .query(Query::new().prefix("items"))
        .unwrap()
        .rest()
        .await
        .unwrap();

    let seen: BTreeSet<String> = keys_of(&entries).into_iter().collect();
    assert_eq!(entries.len(), expected.len(), "duplicate keys in scan");
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_values_and_sizes() {
    let ds = create_ephemeral();
    populate(&ds, &[("a/1", "hello")]);

    let with_values = ds.query(Query::new().prefix("a")).unwrap().rest().await.unwrap();
    assert_eq!(with_values[0].value.as_deref(), Some(&b"hello"[..]));
    assert_eq!(with_values[0].size, 5);

    let sizes_only = ds
        .query(Query::new().prefix("a").keys_only(true).returns_sizes(true))
        .unwrap()
        .rest()
        .await
        .unwrap();
    assert_eq!(sizes_only[0].value, None);
    assert_eq!(sizes_only[0].size, 5);
}

// =============================================================================
// FILTERS / ORDERS / OFFSET
// =============================================================================

#[tokio::test]
async fn test_order_by_key_descending() {
    let ds = create_ephemeral();
    populate(&ds, &[("k/1", "a"), ("k/2", "b"), ("k/3", "c")]);

    let entries = ds
        .query(Query::new().prefix("k").order(Order::ByKeyDescending))
        .unwrap()
        .rest()
        .await
        .unwrap();

    assert_eq!(keys_of(&entries), vec!["/k/3", "/k/2", "/k/1"]);
}

#[tokio::test]
async fn test_order_by_value_with_offset_and_limit() {
    let ds = create_ephemeral();
    populate(&ds, &[("k/1", "d"), ("k/2", "b"), ("k/3", "a"), ("k/4", "c")]);

    let entries = ds
        .query(Query::new().order(Order::ByValue).offset(1).limit(2))
        .unwrap()
        .rest()
        .await
        .unwrap();

    assert_eq!(keys_of(&entries), vec!["/k/2", "/k/4"]);
}

#[tokio::test]
async fn test_filters_combine() {
    let ds = create_ephemeral();
    populate(&ds, &[("k/1", "x"), ("k/2", "y"), ("k/3", "x"), ("k/4", "x")]);

    let query = Query::new()
        .filter(Filter::ValueCompare {
            op: CompareOp::Equal,
            value: b"x".to_vec(),
        })
        .filter(Filter::KeyCompare {
            op: CompareOp::LessThan,
            key: Key::new("/k/4"),
        });
    let entries = ds.query(query).unwrap().rest().await.unwrap();

    assert_eq!(keys_of(&entries), vec!["/k/1", "/k/3"]);
}

#[tokio::test]
async fn test_offset_past_end() {
    let ds = create_ephemeral();
    populate(&ds, &[("k/1", "x"), ("k/2", "y")]);

    let entries = ds.query(Query::new().offset(5)).unwrap().rest().await.unwrap();

    assert!(entries.is_empty());
}

// =============================================================================
// ERRORS
// =============================================================================

#[tokio::test]
async fn test_value_order_in_keys_only_is_rejected() {
    let ds = create_ephemeral();

    let err = ds
        .query(Query::new().keys_only(true).order(Order::ByValueDescending))
        .unwrap_err();

    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn test_prefix_longer_than_max_key_is_rejected() {
    let ds = CaskDatastore::builder().max_key_size(16).ephemeral().unwrap();

    let err = ds
        .query(Query::new().prefix("a/very/long/prefix/indeed"))
        .unwrap_err();

    assert!(err.is_invalid_query());
}

#[test]
fn test_query_outside_runtime() {
    let ds = create_ephemeral();

    assert!(matches!(ds.query(Query::new()), Err(Error::NoRuntime)));
}

#[tokio::test]
async fn test_query_reflects_description() {
    let ds = create_ephemeral();
    let query = Query::new().prefix("a").limit(3);

    let results = ds.query(query.clone()).unwrap();

    assert_eq!(results.query(), &query);
}
