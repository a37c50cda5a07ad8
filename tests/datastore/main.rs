//! Datastore Integration Test Suite
//!
//! Exercises the public `caskds` API end to end: single-key operations,
//! streaming queries, batches, cancellation, and reopening a disk-backed
//! store.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all datastore tests
//! cargo test --test datastore
//!
//! # Run query tests only
//! cargo test --test datastore query_ops::
//! ```

use caskds::prelude::*;
use caskds::LogEngine;
use tempfile::TempDir;

// Test modules
pub mod basic_ops;
pub mod batch_ops;
pub mod cancellation;
pub mod persistence;
pub mod query_ops;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route library logs to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create an in-memory datastore
pub fn create_ephemeral() -> CaskDatastore<caskds::MemoryEngine> {
    init_tracing();
    CaskDatastore::ephemeral()
}

/// Create a disk-backed datastore in a fresh temp directory.
///
/// The directory is removed when the returned `TempDir` drops.
pub fn create_on_disk() -> (CaskDatastore<LogEngine>, TempDir) {
    init_tracing();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ds = CaskDatastore::builder()
        .path(dir.path())
        .no_durability()
        .open()
        .expect("Failed to open datastore");
    (ds, dir)
}

/// Reopen a disk-backed datastore in an existing directory
pub fn reopen(dir: &TempDir) -> CaskDatastore<LogEngine> {
    CaskDatastore::builder()
        .path(dir.path())
        .no_durability()
        .open()
        .expect("Failed to reopen datastore")
}

/// Store each `(key, value)` pair
pub fn populate<E: caskds::KeyValueEngine>(ds: &CaskDatastore<E>, entries: &[(&str, &str)]) {
    for (key, value) in entries {
        ds.put(&Key::new(key), value.as_bytes())
            .expect("Failed to populate datastore");
    }
}

/// Keys of a result set, as strings
pub fn keys_of(entries: &[Entry]) -> Vec<String> {
    entries.iter().map(|e| e.key.to_string()).collect()
}
