//! Cancellation tests.

use crate::*;
use std::time::Duration;

fn many_keys<E: caskds::KeyValueEngine>(ds: &CaskDatastore<E>, n: usize) {
    for i in 0..n {
        ds.put(&Key::new(format!("/c/{:05}", i)), b"value").unwrap();
    }
}

#[tokio::test]
async fn test_cancel_after_partial_consumption() {
    let ds = CaskDatastore::builder()
        .query_buffer_size(2)
        .ephemeral()
        .unwrap();
    many_keys(&ds, 500);

    let mut results = ds.query(Query::new().prefix("c")).unwrap();
    for _ in 0..3 {
        assert!(results.next().await.unwrap().is_ok());
    }

    results.cancel();
    assert!(results.is_cancelled());
    assert!(results.next().await.is_none());

    tokio::time::timeout(Duration::from_secs(5), results.close())
        .await
        .expect("producer did not stop after cancel")
        .unwrap();
}

#[tokio::test]
async fn test_close_without_consuming() {
    let (ds, _dir) = create_on_disk();
    many_keys(&ds, 200);

    let results = ds.query(Query::new()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), results.close())
        .await
        .expect("producer did not stop on close")
        .unwrap();
}

#[tokio::test]
async fn test_drop_releases_producer() {
    let ds = CaskDatastore::builder()
        .query_buffer_size(1)
        .ephemeral()
        .unwrap();
    many_keys(&ds, 100);
    let baseline = std::sync::Arc::strong_count(ds.engine());

    let results = ds.query(Query::new()).unwrap();
    drop(results);

    tokio::time::timeout(Duration::from_secs(5), async {
        while std::sync::Arc::strong_count(ds.engine()) > baseline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("producer kept the engine alive after drop");
}

#[tokio::test]
async fn test_writes_during_query_do_not_fail_it() {
    let ds = CaskDatastore::builder()
        .query_buffer_size(1)
        .ephemeral()
        .unwrap();
    many_keys(&ds, 50);

    let mut results = ds.query(Query::new().prefix("c")).unwrap();
    let mut seen = 0;
    while let Some(record) = results.next().await {
        record.unwrap();
        seen += 1;
        if seen == 1 {
            for i in 10..20 {
                ds.delete(&Key::new(format!("/c/{:05}", i))).unwrap();
            }
        }
    }

    assert!(seen >= 40 && seen <= 50, "saw {} records", seen);
}
