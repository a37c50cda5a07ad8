//! Engine error types.

use std::io;
use thiserror::Error;

/// Errors produced by a [`KeyValueEngine`](crate::KeyValueEngine).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is not present in the key directory.
    ///
    /// Callers above the engine translate this into their own not-found
    /// signal; every other variant is a genuine failure.
    #[error("key not found")]
    KeyNotFound,

    /// Zero-length keys cannot be stored.
    #[error("empty key")]
    EmptyKey,

    /// Key exceeds the configured maximum.
    #[error("key too large: {size} bytes (max {max})")]
    KeyTooLarge {
        /// Size of the rejected key
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Value exceeds the configured maximum.
    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge {
        /// Size of the rejected value
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// A datafile record failed validation.
    #[error("corrupt record in datafile {file_id} at offset {offset}: {reason}")]
    Corruption {
        /// Datafile containing the record
        file_id: u32,
        /// Byte offset of the record
        offset: u64,
        /// What failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Check if this is the engine's key-absent signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::KeyNotFound)
    }

    /// Check if this error reports on-disk damage.
    pub fn is_corruption(&self) -> bool {
        matches!(self, StorageError::Corruption { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, StorageError>;
