//! Engine configuration.

use crate::durability::DurabilityMode;
use serde::{Deserialize, Serialize};

/// Default maximum key size in bytes.
pub const DEFAULT_MAX_KEY_SIZE: usize = 256;

/// Default maximum value size in bytes (1 MiB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1 << 20;

/// Default datafile rotation threshold (64 MiB).
pub const DEFAULT_MAX_DATAFILE_SIZE: u64 = 64 * 1024 * 1024;

/// Default number of keys copied out of the key directory per scan step.
pub const DEFAULT_SCAN_CHUNK_SIZE: usize = 256;

/// Limits and tuning shared by every engine.
///
/// Deserializable so a host application can embed it in its own config;
/// missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted key
    pub max_key_size: usize,
    /// Largest accepted value
    pub max_value_size: usize,
    /// Size at which the active datafile is rotated
    pub max_datafile_size: u64,
    /// When appends are fsynced
    pub durability: DurabilityMode,
    /// Keys copied per scan step; the index lock is released between steps
    pub scan_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            max_datafile_size: DEFAULT_MAX_DATAFILE_SIZE,
            durability: DurabilityMode::default(),
            scan_chunk_size: DEFAULT_SCAN_CHUNK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Validate a key/value pair against the configured limits.
    pub(crate) fn check_entry(&self, key: &[u8], value: Option<&[u8]>) -> crate::Result<()> {
        self.check_key(key)?;
        if let Some(value) = value {
            if value.len() > self.max_value_size {
                return Err(crate::StorageError::ValueTooLarge {
                    size: value.len(),
                    max: self.max_value_size,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn check_key(&self, key: &[u8]) -> crate::Result<()> {
        if key.is_empty() {
            return Err(crate::StorageError::EmptyKey);
        }
        if key.len() > self.max_key_size {
            return Err(crate::StorageError::KeyTooLarge {
                size: key.len(),
                max: self.max_key_size,
            });
        }
        Ok(())
    }
}
