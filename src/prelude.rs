//! Convenient imports for caskds.
//!
//! ```
//! use caskds::prelude::*;
//!
//! let ds = CaskDatastore::ephemeral();
//! ds.put(&Key::new("/k"), b"v")?;
//! # Ok::<(), caskds::Error>(())
//! ```

// Main entry point
pub use crate::batch::CaskBatch;
pub use crate::datastore::{CaskDatastore, DatastoreBuilder};

// Error handling
pub use caskds_core::{Error, Result};

// Keys and queries
pub use caskds_core::{CompareOp, Entry, Filter, Key, Order, Query};
pub use caskds_query::QueryResults;

// Configuration
pub use caskds_storage::{DurabilityMode, EngineConfig};
