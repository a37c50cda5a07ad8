//! Durability mode for datafile appends.
//!
//! Defines when appended records are fsynced to disk.

use serde::{Deserialize, Serialize};

/// Durability mode for datafile appends.
///
/// Controls when data is fsynced to disk and the trade-off between
/// performance and durability. An explicit `sync()` always fsyncs,
/// regardless of mode.
///
/// # Mode Comparison
///
/// | Mode | fsync | Use Case |
/// |------|-------|----------|
/// | None | only on `sync()` | Tests, caches, bulk loads |
/// | Batched | every N writes | Production (balanced) |
/// | Strict | every write | Audit logs, small critical data |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    /// Leave flushing to the OS until `sync()` is called.
    ///
    /// Writes still reach the datafile immediately, so they are visible to
    /// readers and survive a process crash, but not a power loss.
    None,

    /// fsync after every write (slow, maximum durability).
    Strict,

    /// fsync after every `batch_size` writes.
    ///
    /// May lose up to `batch_size - 1` writes on power loss.
    Batched {
        /// Maximum writes between fsyncs
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// Whether a write that brings the unsynced count to `pending` must fsync.
    pub fn should_sync(&self, pending: usize) -> bool {
        match self {
            DurabilityMode::None => false,
            DurabilityMode::Strict => true,
            DurabilityMode::Batched { batch_size } => pending >= (*batch_size).max(1),
        }
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::None => "No fsync until sync() (fastest)",
            DurabilityMode::Strict => "fsync every write (safest, slowest)",
            DurabilityMode::Batched { .. } => "Batched fsync (balanced speed/safety)",
        }
    }

    /// Create a buffered mode with recommended defaults.
    ///
    /// Returns `Batched { batch_size: 1000 }`.
    pub fn buffered_default() -> Self {
        DurabilityMode::Batched { batch_size: 1000 }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::buffered_default()
    }
}
