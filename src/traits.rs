//! Storage interface traits.
//!
//! Applications written against these traits can swap the backing
//! datastore without changing call sites. [`CaskDatastore`](crate::CaskDatastore)
//! implements all of them.

use caskds_core::{Key, Query, Result};
use caskds_query::QueryResults;

/// Read access.
pub trait Read {
    /// Value stored under `key`, or [`Error::NotFound`](crate::Error::NotFound).
    fn get(&self, key: &Key) -> Result<Vec<u8>>;

    /// Whether a value is stored under `key`.
    fn has(&self, key: &Key) -> Result<bool>;

    /// Length of the value stored under `key`.
    fn get_size(&self, key: &Key) -> Result<usize>;

    /// Start a query. Must be called within a Tokio runtime.
    fn query(&self, query: Query) -> Result<QueryResults>;
}

/// Write access.
pub trait Write {
    /// Store `value` under `key`.
    fn put(&self, key: &Key, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &Key) -> Result<()>;
}

/// A full datastore.
pub trait Datastore: Read + Write {
    /// Flush buffered writes to stable storage.
    fn sync(&self) -> Result<()>;

    /// Flush and release the datastore.
    fn close(&self) -> Result<()>;
}

/// A group of mutations applied together.
pub trait Batch {
    /// Queue a put.
    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()>;

    /// Queue a delete.
    fn delete(&mut self, key: Key) -> Result<()>;

    /// Apply queued mutations in order.
    fn commit(&mut self) -> Result<()>;
}

/// A datastore that can group writes.
pub trait Batching: Datastore {
    /// Batch type handed out by [`batch`](Self::batch).
    type Batch: Batch;

    /// Start an empty batch.
    fn batch(&self) -> Result<Self::Batch>;
}

/// A datastore that can reclaim space on demand.
pub trait GcDatastore: Datastore {
    /// Reclaim space held by overwritten and deleted entries.
    fn collect_garbage(&self) -> Result<()>;
}
