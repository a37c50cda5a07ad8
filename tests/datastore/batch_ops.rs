//! Batch tests.

use crate::*;
use caskds::traits::{Batch, Batching};
use caskds::StorageError;

#[test]
fn test_later_put_wins() {
    let ds = create_ephemeral();
    let key = Key::new("/k");
    let mut batch = ds.batch();

    batch.put(key.clone(), b"a".to_vec()).unwrap();
    batch.put(key.clone(), b"b".to_vec()).unwrap();
    batch.commit().unwrap();

    assert_eq!(ds.get(&key).unwrap(), b"b");
}

#[test]
fn test_put_then_delete_in_batch() {
    let (ds, _dir) = create_on_disk();
    let key = Key::new("/k");
    let mut batch = ds.batch();

    batch.put(key.clone(), b"a".to_vec()).unwrap();
    batch.delete(key.clone()).unwrap();
    batch.commit().unwrap();

    assert!(ds.get(&key).unwrap_err().is_not_found());
}

#[test]
fn test_batch_invisible_until_commit() {
    let ds = create_ephemeral();
    let mut batch = ds.batch();

    batch.put(Key::new("/pending"), b"v".to_vec()).unwrap();

    assert!(!ds.has(&Key::new("/pending")).unwrap());
    assert_eq!(batch.len(), 1);
}

#[test]
fn test_partial_failure_keeps_prefix_applied() {
    let ds = CaskDatastore::builder()
        .max_value_size(4)
        .ephemeral()
        .unwrap();
    let mut batch = ds.batch();

    batch.put(Key::new("/1"), b"ok".to_vec()).unwrap();
    batch.put(Key::new("/2"), b"much too large".to_vec()).unwrap();
    batch.put(Key::new("/3"), b"ok".to_vec()).unwrap();

    let err = batch.commit().unwrap_err();

    assert!(matches!(
        err,
        Error::Storage(StorageError::ValueTooLarge { .. })
    ));
    assert_eq!(ds.get(&Key::new("/1")).unwrap(), b"ok");
    assert!(!ds.has(&Key::new("/2")).unwrap());
    assert!(!ds.has(&Key::new("/3")).unwrap());
}

#[test]
fn test_commit_twice_is_noop() {
    let ds = create_ephemeral();
    let key = Key::new("/k");
    let mut batch = ds.batch();

    batch.put(key.clone(), b"v".to_vec()).unwrap();
    batch.commit().unwrap();
    ds.delete(&key).unwrap();
    batch.commit().unwrap();

    assert!(!ds.has(&key).unwrap());
    assert!(batch.is_empty());
}

#[test]
fn test_batching_trait() {
    fn write_pair<D: Batching>(ds: &D) -> caskds::Result<()> {
        let mut batch = ds.batch()?;
        batch.put(Key::new("/x"), b"1".to_vec())?;
        batch.put(Key::new("/y"), b"2".to_vec())?;
        batch.commit()
    }

    let ds = create_ephemeral();
    write_pair(&ds).unwrap();

    assert_eq!(ds.get(&Key::new("/y")).unwrap(), b"2");
}
