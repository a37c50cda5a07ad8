//! Reopen and garbage collection tests.

use crate::*;
use caskds::traits::GcDatastore;

#[test]
fn test_data_survives_reopen() {
    let (ds, dir) = create_on_disk();
    populate(&ds, &[("a", "1"), ("b", "2"), ("c", "3")]);
    ds.delete(&Key::new("/b")).unwrap();
    ds.close().unwrap();
    drop(ds);

    let ds = reopen(&dir);

    assert_eq!(ds.get(&Key::new("/a")).unwrap(), b"1");
    assert!(ds.get(&Key::new("/b")).unwrap_err().is_not_found());
    assert_eq!(ds.get(&Key::new("/c")).unwrap(), b"3");
}

#[test]
fn test_collect_garbage_preserves_live_data() {
    let (ds, dir) = create_on_disk();
    for round in 0..5 {
        for i in 0..20 {
            ds.put(&Key::new(format!("/k/{}", i)), format!("r{}", round).as_bytes())
                .unwrap();
        }
    }
    ds.delete(&Key::new("/k/0")).unwrap();
    let before = ds.stats();
    assert!(before.reclaimable_bytes > 0);

    ds.collect_garbage().unwrap();

    let after = ds.stats();
    assert!(after.total_bytes < before.total_bytes);
    assert_eq!(after.reclaimable_bytes, 0);
    assert_eq!(after.keys, 19);
    assert_eq!(ds.get(&Key::new("/k/7")).unwrap(), b"r4");
    drop(ds);

    let ds = reopen(&dir);
    assert_eq!(ds.get(&Key::new("/k/19")).unwrap(), b"r4");
    assert!(!ds.has(&Key::new("/k/0")).unwrap());
}

#[test]
fn test_gc_trait_on_ephemeral() {
    let ds = create_ephemeral();
    populate(&ds, &[("a", "1")]);

    GcDatastore::collect_garbage(&ds).unwrap();

    assert_eq!(ds.get(&Key::new("/a")).unwrap(), b"1");
}

#[tokio::test]
async fn test_query_after_reopen() {
    let (ds, dir) = create_on_disk();
    populate(&ds, &[("q/1", "a"), ("q/2", "b")]);
    ds.sync().unwrap();
    drop(ds);

    let ds = reopen(&dir);
    let entries = ds.query(Query::new().prefix("q")).unwrap().rest().await.unwrap();

    assert_eq!(keys_of(&entries), vec!["/q/1", "/q/2"]);
}

#[test]
fn test_small_datafiles_rotate() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let ds = CaskDatastore::builder()
        .path(dir.path())
        .max_datafile_size(256)
        .open()
        .unwrap();

    for i in 0..50 {
        ds.put(&Key::new(format!("/r/{}", i)), &[b'x'; 32]).unwrap();
    }

    assert!(ds.stats().datafiles > 1);
    assert_eq!(ds.get(&Key::new("/r/0")).unwrap(), vec![b'x'; 32]);
}
