//! Write batches.
//!
//! A batch buffers puts and deletes and applies them in order on
//! [`commit`](CaskBatch::commit). There is no atomicity beyond each single
//! engine write: if a mutation fails, the ones before it stay applied and
//! the ones after it are dropped.

use caskds_core::{codec, Error, Key, Result};
use caskds_storage::KeyValueEngine;
use std::mem;
use std::sync::Arc;
use tracing::{debug, warn};

/// A queued mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Store a value
    Put {
        /// Target key
        key: Key,
        /// New value
        value: Vec<u8>,
    },
    /// Remove a key
    Delete {
        /// Target key
        key: Key,
    },
}

impl Mutation {
    /// Key this mutation targets.
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }

    /// Whether this is a delete.
    pub fn is_delete(&self) -> bool {
        matches!(self, Mutation::Delete { .. })
    }
}

/// Buffered mutations against a datastore's engine.
///
/// # Example
///
/// ```
/// use caskds::prelude::*;
///
/// let ds = CaskDatastore::ephemeral();
/// let mut batch = ds.batch();
/// batch.put(Key::new("/k"), b"a".to_vec())?;
/// batch.put(Key::new("/k"), b"b".to_vec())?;
/// batch.commit()?;
///
/// assert_eq!(ds.get(&Key::new("/k"))?, b"b");
/// # Ok::<(), caskds::Error>(())
/// ```
pub struct CaskBatch<E: KeyValueEngine> {
    engine: Arc<E>,
    pending: Vec<Mutation>,
}

impl<E: KeyValueEngine> CaskBatch<E> {
    pub(crate) fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            pending: Vec::new(),
        }
    }

    /// Queue a put. Never fails.
    pub fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()> {
        self.pending.push(Mutation::Put { key, value });
        Ok(())
    }

    /// Queue a delete. Never fails.
    pub fn delete(&mut self, key: Key) -> Result<()> {
        self.pending.push(Mutation::Delete { key });
        Ok(())
    }

    /// Queued mutations, oldest first.
    pub fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    /// Number of queued mutations.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every queued mutation in order, stopping at the first failure.
    ///
    /// The queue is emptied up front, so the batch is empty afterwards
    /// whatever the outcome and a second commit does nothing.
    pub fn commit(&mut self) -> Result<()> {
        let pending = mem::take(&mut self.pending);
        let total = pending.len();

        for (applied, mutation) in pending.iter().enumerate() {
            let key = codec::encode_key(mutation.key());
            let result = match mutation {
                Mutation::Put { value, .. } => self.engine.put(key, value),
                Mutation::Delete { .. } => self.engine.delete(key),
            };

            if let Err(err) = result {
                warn!(
                    "Batch commit stopped at mutation {} of {} ({}): {}",
                    applied + 1,
                    total,
                    mutation.key(),
                    err
                );
                return Err(Error::Storage(err));
            }
        }

        debug!("Batch committed {} mutations", total);
        Ok(())
    }
}

impl<E: KeyValueEngine> crate::traits::Batch for CaskBatch<E> {
    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()> {
        CaskBatch::put(self, key, value)
    }

    fn delete(&mut self, key: Key) -> Result<()> {
        CaskBatch::delete(self, key)
    }

    fn commit(&mut self) -> Result<()> {
        CaskBatch::commit(self)
    }
}

impl<E: KeyValueEngine> std::fmt::Debug for CaskBatch<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaskBatch")
            .field("pending", &self.pending.len())
            .finish()
    }
}
