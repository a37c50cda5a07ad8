//! Query execution for caskds
//!
//! Turns a [`Query`](caskds_core::Query) into a cancellable stream of
//! results pulled concurrently from a [`KeyValueEngine`](caskds_storage::KeyValueEngine):
//! - QueryExecutor: validates queries and spawns the scan producer
//! - QueryResults: the consumer side, with filters, orders, offset and limit
//!   applied as records are pulled

#![warn(missing_docs)]
#![warn(clippy::all)]

mod apply;
pub mod executor;
pub mod results;

pub use executor::{QueryExecutor, DEFAULT_BUFFER_SIZE};
pub use results::QueryResults;
