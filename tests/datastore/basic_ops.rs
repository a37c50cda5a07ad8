//! Single-key operation tests.

use crate::*;
use caskds::StorageError;
use proptest::prelude::*;

// =============================================================================
// GET / PUT / DELETE
// =============================================================================

#[test]
fn test_put_then_get() {
    let ds = create_ephemeral();
    let key = Key::new("/a/1");

    ds.put(&key, b"hello").unwrap();

    assert_eq!(ds.get(&key).unwrap(), b"hello");
    assert!(ds.has(&key).unwrap());
    assert_eq!(ds.get_size(&key).unwrap(), 5);
}

#[test]
fn test_overwrite_returns_latest() {
    let ds = create_ephemeral();
    let key = Key::new("/a");

    ds.put(&key, b"one").unwrap();
    ds.put(&key, b"two").unwrap();

    assert_eq!(ds.get(&key).unwrap(), b"two");
}

#[test]
fn test_get_absent_is_not_found() {
    let ds = create_ephemeral();

    let err = ds.get(&Key::new("/nope")).unwrap_err();

    assert!(err.is_not_found());
    assert!(!ds.has(&Key::new("/nope")).unwrap());
}

#[test]
fn test_deleted_key_is_not_found() {
    let (ds, _dir) = create_on_disk();
    let key = Key::new("/gone");

    ds.put(&key, b"v").unwrap();
    ds.delete(&key).unwrap();

    assert!(matches!(ds.get(&key), Err(Error::NotFound(_))));
    assert!(!ds.has(&key).unwrap());
    assert!(ds.get_size(&key).unwrap_err().is_not_found());
}

#[test]
fn test_delete_absent_succeeds() {
    let ds = create_ephemeral();
    ds.delete(&Key::new("/never")).unwrap();
}

#[test]
fn test_empty_value() {
    let (ds, _dir) = create_on_disk();
    let key = Key::new("/empty");

    ds.put(&key, b"").unwrap();

    assert_eq!(ds.get(&key).unwrap(), Vec::<u8>::new());
    assert_eq!(ds.get_size(&key).unwrap(), 0);
}

#[test]
fn test_key_normalization_is_transparent() {
    let ds = create_ephemeral();

    ds.put(&Key::new("a//b/"), b"v").unwrap();

    assert_eq!(ds.get(&Key::new("/a/b")).unwrap(), b"v");
}

// =============================================================================
// LIMITS
// =============================================================================

#[test]
fn test_value_too_large_is_storage_error() {
    let ds = CaskDatastore::builder()
        .max_value_size(8)
        .ephemeral()
        .unwrap();

    let err = ds.put(&Key::new("/k"), &[0u8; 9]).unwrap_err();

    assert!(matches!(
        err,
        Error::Storage(StorageError::ValueTooLarge { size: 9, max: 8 })
    ));
}

#[test]
fn test_key_too_large_is_storage_error() {
    let (ds, _dir) = create_on_disk();
    let key = Key::new(format!("/{}", "k".repeat(300)));

    let err = ds.put(&key, b"v").unwrap_err();

    assert!(matches!(
        err,
        Error::Storage(StorageError::KeyTooLarge { size: 301, max: 256 })
    ));
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_put_get_roundtrip(
        path in "[a-z0-9]{1,8}(/[a-z0-9]{1,8}){0,3}",
        value in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let ds = CaskDatastore::ephemeral();
        let key = Key::new(&path);

        ds.put(&key, &value).unwrap();

        prop_assert_eq!(ds.get(&key).unwrap(), value.clone());
        prop_assert_eq!(ds.get_size(&key).unwrap(), value.len());
    }

    #[test]
    fn prop_roundtrip_on_disk(
        entries in proptest::collection::btree_map("[a-z]{1,6}", proptest::collection::vec(any::<u8>(), 0..64), 1..20),
    ) {
        let (ds, _dir) = create_on_disk();
        for (path, value) in &entries {
            ds.put(&Key::new(path), value).unwrap();
        }
        for (path, value) in &entries {
            prop_assert_eq!(&ds.get(&Key::new(path)).unwrap(), value);
        }
    }
}
