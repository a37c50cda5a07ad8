//! Datastore error type.
//!
//! Wraps engine failures and adds the conditions only the datastore layer
//! knows about: which key was missing, malformed queries, and a missing
//! async runtime.

use crate::key::Key;
use caskds_storage::StorageError;
use thiserror::Error;

/// All caskds errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No value is stored under the key
    #[error("not found: {0}")]
    NotFound(Key),

    /// The engine failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The query cannot be executed as written
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The datastore was configured inconsistently
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Queries are executed on a Tokio runtime and none was found
    #[error("query execution requires a Tokio runtime")]
    NoRuntime,

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for caskds operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Translate an engine error for an operation on `key`.
    ///
    /// The engine's key-absent signal becomes [`Error::NotFound`] carrying
    /// the key; everything else is wrapped as [`Error::Storage`].
    pub fn for_key(key: &Key, err: StorageError) -> Self {
        if err.is_not_found() {
            Error::NotFound(key.clone())
        } else {
            Error::Storage(err)
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
            || matches!(self, Error::Storage(e) if e.is_not_found())
    }

    /// Check if this is a query validation error.
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Error::InvalidQuery(_))
    }

    /// Check if this error reports on-disk damage.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_corruption())
    }
}
