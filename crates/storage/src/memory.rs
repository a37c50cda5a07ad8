//! In-memory engine.
//!
//! Same contract and limits as [`LogEngine`](crate::LogEngine) with no disk
//! I/O. Data is lost when the engine is dropped. Used for ephemeral
//! datastores and tests.

use crate::config::EngineConfig;
use crate::engine::{EngineStats, KeyValueEngine, ScanOutcome, Visit};
use crate::error::{Result, StorageError};
use crate::scan::{prefix_chunk, run_chunked};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// `BTreeMap`-backed engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    config: EngineConfig,
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    /// Create an empty engine with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty engine with the given limits.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            data: RwLock::new(BTreeMap::new()),
        }
    }
}

impl KeyValueEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or(StorageError::KeyNotFound)
    }

    fn has(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.config.check_entry(key, Some(value))?;
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.config.check_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8], visit: &mut dyn FnMut(&[u8]) -> Visit) -> ScanOutcome {
        let chunk = self.config.scan_chunk_size;
        run_chunked(
            |after| prefix_chunk(&*self.data.read(), prefix, after, chunk),
            visit,
        )
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn merge(&self) -> Result<()> {
        Ok(())
    }

    fn max_key_size(&self) -> usize {
        self.config.max_key_size
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            keys: self.data.read().len(),
            ..Default::default()
        }
    }
}
