//! Core types for caskds
//!
//! This crate defines the vocabulary shared by the query executor and the
//! datastore facade:
//! - Key: normalized namespace paths
//! - Query, Filter, Order: declarative query descriptions
//! - Entry, QueryResult: what a query yields
//! - codec: key/value marshaling to and from engine bytes
//! - Error: the public error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod key;
pub mod query;

pub use error::{Error, Result};
pub use key::Key;
pub use query::{compare_entries, CompareOp, Entry, Filter, Order, Query, QueryResult};
