//! The engine contract consumed by the datastore layer.
//!
//! Everything above this crate talks to storage through [`KeyValueEngine`].
//! Scans use a visitor instead of an iterator so that an engine can decide
//! how much of its index it pins while the caller does slow work per key.

use crate::error::{Result, StorageError};

/// Decision returned by a scan visitor for each key.
#[derive(Debug)]
pub enum Visit {
    /// Keep enumerating.
    Continue,
    /// The consumer is gone; end the scan quietly.
    Stop,
    /// The caller's result cap was hit.
    LimitReached,
    /// Abort the scan with an error.
    Fail(StorageError),
}

/// How a prefix scan ended.
///
/// `LimitReached` is a control signal, not a failure. Keeping it as its own
/// variant lets callers suppress it with an explicit match arm instead of
/// comparing against a sentinel error.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Every matching key was visited.
    Completed,
    /// The visitor asked to stop.
    Stopped,
    /// The visitor reported the result cap.
    LimitReached,
    /// The engine or the visitor failed.
    Failed(StorageError),
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Live keys in the key directory
    pub keys: usize,
    /// Datafiles on disk (0 for in-memory engines)
    pub datafiles: usize,
    /// Total bytes across datafiles
    pub total_bytes: u64,
    /// Bytes held by superseded records and tombstones
    pub reclaimable_bytes: u64,
}

/// An embedded key-value store.
///
/// Implementations must be safe for concurrent readers and writers. No
/// snapshot is implied between a scan and point lookups issued during it.
pub trait KeyValueEngine: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// Returns [`StorageError::KeyNotFound`] if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Check whether `key` is present.
    fn has(&self, key: &[u8]) -> bool;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Deleting an absent key succeeds.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Visit every key starting with `prefix` in enumeration order.
    ///
    /// An empty prefix visits every key.
    fn scan_prefix(&self, prefix: &[u8], visit: &mut dyn FnMut(&[u8]) -> Visit) -> ScanOutcome;

    /// Flush buffered writes to durable storage.
    fn sync(&self) -> Result<()>;

    /// Reclaim space held by superseded and deleted entries.
    fn merge(&self) -> Result<()>;

    /// Largest key this engine accepts.
    fn max_key_size(&self) -> usize;

    /// Current statistics.
    fn stats(&self) -> EngineStats;
}
