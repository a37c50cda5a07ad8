//! # caskds
//!
//! A datastore interface over an embedded, append-only log-structured
//! key-value engine.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caskds::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> caskds::Result<()> {
//! // Open a datastore
//! let ds = CaskDatastore::open("./my-store")?;
//!
//! // Single-key operations
//! ds.put(&Key::new("/users/1"), b"alice")?;
//! let name = ds.get(&Key::new("/users/1"))?;
//!
//! // Grouped writes
//! let mut batch = ds.batch();
//! batch.put(Key::new("/users/2"), b"bob".to_vec())?;
//! batch.delete(Key::new("/users/1"))?;
//! batch.commit()?;
//!
//! // Streaming queries
//! let mut results = ds.query(Query::new().prefix("/users").keys_only(true))?;
//! while let Some(entry) = results.next().await {
//!     println!("{}", entry?.key);
//! }
//!
//! // Graceful shutdown
//! ds.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`CaskDatastore`] - the datastore facade
//! - [`CaskBatch`] - buffered writes applied in order on commit
//! - [`QueryResults`] - lazily produced, cancellable query results
//! - [`traits`] - storage interface traits the facade implements
//!
//! The engine lives in `caskds-storage`, the shared types in `caskds-core`
//! and query execution in `caskds-query`.

#![warn(missing_docs)]

mod batch;
mod datastore;
pub mod traits;

pub mod prelude;

// Re-export main entry points
pub use batch::{CaskBatch, Mutation};
pub use datastore::{CaskDatastore, DatastoreBuilder};

// Re-export shared types
pub use caskds_core::{CompareOp, Entry, Error, Filter, Key, Order, Query, QueryResult, Result};
pub use caskds_query::QueryResults;
pub use caskds_storage::{
    DurabilityMode, EngineConfig, EngineStats, KeyValueEngine, LogEngine, MemoryEngine,
    StorageError,
};
