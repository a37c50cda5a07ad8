//! Storage engine for caskds
//!
//! This crate implements the embedded key-value engine behind the datastore:
//! - KeyValueEngine: the contract the datastore layer consumes
//! - LogEngine: append-only datafiles + in-memory key directory (bitcask-style)
//! - MemoryEngine: BTreeMap-backed engine with no disk I/O
//! - Crash recovery with torn-tail truncation
//! - Merge (compaction) of superseded records and tombstones
//! - Durability modes: None, Batched, Strict

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod datafile;
pub mod durability;
pub mod engine;
pub mod error;
pub mod format;
pub mod log;
pub mod memory;
mod scan;

pub use config::EngineConfig;
pub use durability::DurabilityMode;
pub use engine::{EngineStats, KeyValueEngine, ScanOutcome, Visit};
pub use error::{Result, StorageError};
pub use log::{LogEngine, RecoveryInfo};
pub use memory::MemoryEngine;
