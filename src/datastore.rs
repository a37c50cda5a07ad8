//! Main datastore entry point.
//!
//! [`CaskDatastore`] composes the engine with the query executor and hands
//! out write batches. Single-key operations go straight to the engine.

use crate::batch::CaskBatch;
use crate::traits::{Batching, Datastore, GcDatastore, Read, Write};
use caskds_core::{codec, Error, Key, Query, Result};
use caskds_query::{QueryExecutor, QueryResults, DEFAULT_BUFFER_SIZE};
use caskds_storage::{
    DurabilityMode, EngineConfig, EngineStats, KeyValueEngine, LogEngine, MemoryEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A datastore backed by a key-value engine.
///
/// Create one with [`CaskDatastore::open`], [`CaskDatastore::builder`] or
/// [`CaskDatastore::ephemeral`].
///
/// # Example
///
/// ```no_run
/// use caskds::prelude::*;
///
/// let ds = CaskDatastore::open("./my-store")?;
/// ds.put(&Key::new("/users/1"), b"alice")?;
/// assert_eq!(ds.get(&Key::new("/users/1"))?, b"alice");
/// ds.close()?;
/// # Ok::<(), caskds::Error>(())
/// ```
pub struct CaskDatastore<E: KeyValueEngine = LogEngine> {
    engine: Arc<E>,
    executor: QueryExecutor<E>,
}

impl CaskDatastore<LogEngine> {
    /// Open a datastore in `path` with default settings.
    ///
    /// The directory is created if missing. Existing datafiles are replayed
    /// before this returns.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create a builder for datastore configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use caskds::prelude::*;
    ///
    /// let ds = CaskDatastore::builder()
    ///     .path("./my-store")
    ///     .max_value_size(64 * 1024)
    ///     .strict()
    ///     .open()?;
    /// # Ok::<(), caskds::Error>(())
    /// ```
    pub fn builder() -> DatastoreBuilder {
        DatastoreBuilder::new()
    }

    /// Directory holding the datafiles.
    pub fn path(&self) -> &Path {
        self.engine.path()
    }

    /// Current durability mode.
    pub fn durability_mode(&self) -> DurabilityMode {
        self.engine.config().durability
    }
}

impl CaskDatastore<MemoryEngine> {
    /// Create an in-memory datastore. Nothing touches disk and all data is
    /// lost on drop.
    pub fn ephemeral() -> Self {
        Self::from_engine(Arc::new(MemoryEngine::new()))
    }
}

impl<E: KeyValueEngine> CaskDatastore<E> {
    /// Wrap an existing engine with the default query buffer.
    pub fn from_engine(engine: Arc<E>) -> Self {
        Self::with_buffer_size(engine, DEFAULT_BUFFER_SIZE)
    }

    fn with_buffer_size(engine: Arc<E>, buffer_size: usize) -> Self {
        let executor = QueryExecutor::with_buffer_size(Arc::clone(&engine), buffer_size);
        Self { engine, executor }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Engine statistics.
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.engine
            .get(codec::encode_key(key))
            .map_err(|e| Error::for_key(key, e))
    }

    /// Whether a value is stored under `key`.
    pub fn has(&self, key: &Key) -> Result<bool> {
        Ok(self.engine.has(codec::encode_key(key)))
    }

    /// Length of the value stored under `key`.
    pub fn get_size(&self, key: &Key) -> Result<usize> {
        self.get(key).map(|value| value.len())
    }

    /// Store `value` under `key`.
    pub fn put(&self, key: &Key, value: &[u8]) -> Result<()> {
        self.engine
            .put(codec::encode_key(key), value)
            .map_err(Error::Storage)
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: &Key) -> Result<()> {
        self.engine
            .delete(codec::encode_key(key))
            .map_err(Error::Storage)
    }

    /// Start a query. Must be called within a Tokio runtime.
    ///
    /// The results hold a Tokio blocking-pool thread until they are read to
    /// the end, cancelled or dropped, so long-lived streams count against
    /// the runtime's blocking thread limit.
    pub fn query(&self, query: Query) -> Result<QueryResults> {
        self.executor.execute(query)
    }

    /// Start an empty write batch.
    pub fn batch(&self) -> CaskBatch<E> {
        CaskBatch::new(Arc::clone(&self.engine))
    }

    /// Flush buffered writes to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.engine.sync().map_err(Error::Storage)
    }

    /// Reclaim space held by overwritten and deleted entries.
    pub fn collect_garbage(&self) -> Result<()> {
        let before = self.engine.stats();
        self.engine.merge().map_err(Error::Storage)?;
        let after = self.engine.stats();
        info!(
            "Garbage collection reclaimed {} bytes, {} datafiles remain",
            before.total_bytes.saturating_sub(after.total_bytes),
            after.datafiles
        );
        Ok(())
    }

    /// Flush pending writes. The datastore stays usable afterwards, but
    /// callers should treat it as finished.
    pub fn close(&self) -> Result<()> {
        self.sync()?;
        debug!("Datastore closed with {} keys", self.engine.stats().keys);
        Ok(())
    }
}

impl<E: KeyValueEngine> Read for CaskDatastore<E> {
    fn get(&self, key: &Key) -> Result<Vec<u8>> {
        CaskDatastore::get(self, key)
    }

    fn has(&self, key: &Key) -> Result<bool> {
        CaskDatastore::has(self, key)
    }

    fn get_size(&self, key: &Key) -> Result<usize> {
        CaskDatastore::get_size(self, key)
    }

    fn query(&self, query: Query) -> Result<QueryResults> {
        CaskDatastore::query(self, query)
    }
}

impl<E: KeyValueEngine> Write for CaskDatastore<E> {
    fn put(&self, key: &Key, value: &[u8]) -> Result<()> {
        CaskDatastore::put(self, key, value)
    }

    fn delete(&self, key: &Key) -> Result<()> {
        CaskDatastore::delete(self, key)
    }
}

impl<E: KeyValueEngine> Datastore for CaskDatastore<E> {
    fn sync(&self) -> Result<()> {
        CaskDatastore::sync(self)
    }

    fn close(&self) -> Result<()> {
        CaskDatastore::close(self)
    }
}

impl<E: KeyValueEngine> Batching for CaskDatastore<E> {
    type Batch = CaskBatch<E>;

    fn batch(&self) -> Result<Self::Batch> {
        Ok(CaskDatastore::batch(self))
    }
}

impl<E: KeyValueEngine> GcDatastore for CaskDatastore<E> {
    fn collect_garbage(&self) -> Result<()> {
        CaskDatastore::collect_garbage(self)
    }
}

impl<E: KeyValueEngine> std::fmt::Debug for CaskDatastore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaskDatastore")
            .field("stats", &self.engine.stats())
            .field("query_buffer", &self.executor.buffer_size())
            .finish()
    }
}

/// Builder for datastore configuration.
///
/// # Example
///
/// ```no_run
/// use caskds::prelude::*;
///
/// // Durable store with small datafiles
/// let ds = CaskDatastore::builder()
///     .path("./my-store")
///     .max_datafile_size(8 * 1024 * 1024)
///     .open()?;
///
/// // In-memory store with the same limits
/// let scratch = CaskDatastore::builder()
///     .max_value_size(1024)
///     .ephemeral();
/// # Ok::<(), caskds::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatastoreBuilder {
    path: Option<PathBuf>,
    config: EngineConfig,
    query_buffer_size: Option<usize>,
}

impl DatastoreBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the datafile directory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the whole engine configuration, e.g. one deserialized from a
    /// host application's config file.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Maximum key length in bytes.
    pub fn max_key_size(mut self, bytes: usize) -> Self {
        self.config.max_key_size = bytes;
        self
    }

    /// Maximum value length in bytes.
    pub fn max_value_size(mut self, bytes: usize) -> Self {
        self.config.max_value_size = bytes;
        self
    }

    /// Size at which the active datafile is rotated.
    pub fn max_datafile_size(mut self, bytes: u64) -> Self {
        self.config.max_datafile_size = bytes;
        self
    }

    /// Set the durability mode.
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.config.durability = mode;
        self
    }

    /// Only fsync on explicit [`sync`](CaskDatastore::sync) or close.
    pub fn no_durability(self) -> Self {
        self.durability(DurabilityMode::None)
    }

    /// Fsync after every write.
    pub fn strict(self) -> Self {
        self.durability(DurabilityMode::Strict)
    }

    /// Fsync every 1000 writes (default).
    pub fn buffered(self) -> Self {
        self.durability(DurabilityMode::buffered_default())
    }

    /// Records buffered between a query's producer and its consumer.
    pub fn query_buffer_size(mut self, records: usize) -> Self {
        self.query_buffer_size = Some(records);
        self
    }

    /// Keys copied out of the index per scan step.
    pub fn scan_chunk_size(mut self, keys: usize) -> Self {
        self.config.scan_chunk_size = keys;
        self
    }

    fn check(&self) -> Result<()> {
        if self.config.max_key_size == 0 {
            return Err(Error::InvalidConfig("max_key_size must be positive".into()));
        }
        if self.config.scan_chunk_size == 0 {
            return Err(Error::InvalidConfig("scan_chunk_size must be positive".into()));
        }
        if self.query_buffer_size == Some(0) {
            return Err(Error::InvalidConfig("query_buffer_size must be positive".into()));
        }
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.query_buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Open a disk-backed datastore at the configured path.
    pub fn open(self) -> Result<CaskDatastore<LogEngine>> {
        self.check()?;
        let path = self.path.clone().ok_or_else(|| {
            Error::InvalidConfig("no path set; use ephemeral() for an in-memory datastore".into())
        })?;

        let engine = LogEngine::open(&path, self.config.clone()).map_err(Error::Storage)?;
        let recovery = engine.recovery_info();
        info!(
            "Datastore opened at {} ({}, {} records in {} datafiles)",
            path.display(),
            self.config.durability.description(),
            recovery.records,
            recovery.datafiles
        );
        Ok(CaskDatastore::with_buffer_size(
            Arc::new(engine),
            self.buffer_size(),
        ))
    }

    /// Create an in-memory datastore with the configured limits. The path
    /// and durability settings are ignored.
    pub fn ephemeral(self) -> Result<CaskDatastore<MemoryEngine>> {
        self.check()?;
        let engine = MemoryEngine::with_config(self.config.clone());
        Ok(CaskDatastore::with_buffer_size(
            Arc::new(engine),
            self.buffer_size(),
        ))
    }
}
