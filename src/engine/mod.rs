//! Engine Module
//!
//! Boundary to the ordered key-value engine both stores run on.
//!
//! ## Responsibilities
//! - Begin read-only and read-write transactions
//! - Point get/set/delete inside a transaction
//! - Prefix-bounded key scans in both directions
//! - Commit or discard (all-or-nothing)
//! - Size reporting and an optional, caller-triggered compaction
//!
//! ## Backends
//! - [`RedbEngine`]: durable, single file, ACID (production)
//! - [`MemoryEngine`]: BTreeMap snapshots, volatile, O(n) copy per write (tests)

mod memory;
mod redb_engine;

use std::ops::Bound;

use crate::error::{Result, StoreError};

pub use memory::MemoryEngine;
pub use redb_engine::RedbEngine;

// =============================================================================
// Transaction Traits
// =============================================================================

/// An ordered key-value engine with transactions
pub trait StorageEngine: Send + Sync + 'static {
    type Read: ReadTransaction;
    type Write: WriteTransaction;

    /// Begin a read-only transaction over a consistent snapshot
    fn begin_read(&self) -> Result<Self::Read>;

    /// Begin a read-write transaction (writers are serialized by the engine)
    fn begin_write(&self) -> Result<Self::Write>;

    /// Report how much space the engine is using
    fn size(&self) -> Result<EngineSize>;

    /// Reclaim space if at least `discard_ratio` of it is garbage.
    ///
    /// Never called by the stores themselves.
    fn run_value_log_gc(&self, discard_ratio: f64) -> Result<GcOutcome>;

    /// Release all engine resources
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Reads available in every transaction
pub trait ReadTransaction {
    /// Point lookup; `None` when the key is absent
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Collect keys matching a prefix scan
    fn scan_keys(&self, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>>;
}

/// Writes buffered until `commit`
pub trait WriteTransaction: ReadTransaction {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Make every buffered write visible atomically
    fn commit(self) -> Result<()>;

    /// Drop every buffered write
    fn discard(self);
}

// =============================================================================
// Scans
// =============================================================================

/// Iteration direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending from the seek key (inclusive)
    Forward,
    /// Descending from the seek key (inclusive)
    Reverse,
}

/// A bounded walk over the keys sharing a prefix
///
/// The walk starts at `seek` and stops at the first key that does not carry
/// `prefix`, or after `limit` keys.
#[derive(Debug, Clone, Copy)]
pub struct PrefixScan<'a> {
    pub prefix: &'a [u8],
    /// Start key; `None` means the start of the prefix (forward) or the end
    /// of the keyspace (reverse)
    pub seek: Option<&'a [u8]>,
    pub direction: Direction,
    pub limit: usize,
}

impl<'a> PrefixScan<'a> {
    /// Ascending scan starting at `seek`
    pub fn forward(prefix: &'a [u8], seek: &'a [u8]) -> Self {
        Self {
            prefix,
            seek: Some(seek),
            direction: Direction::Forward,
            limit: usize::MAX,
        }
    }

    /// Descending scan starting at `seek`, or at the end of the keyspace
    pub fn reverse(prefix: &'a [u8], seek: Option<&'a [u8]>) -> Self {
        Self {
            prefix,
            seek,
            direction: Direction::Reverse,
            limit: usize::MAX,
        }
    }

    /// Stop after `limit` keys
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Key bounds handed to the engine's ordered range
    pub(crate) fn bounds(&self) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
        match self.direction {
            Direction::Forward => (
                Bound::Included(self.seek.unwrap_or(self.prefix)),
                Bound::Unbounded,
            ),
            Direction::Reverse => (
                Bound::Unbounded,
                self.seek.map_or(Bound::Unbounded, Bound::Included),
            ),
        }
    }

    /// Apply the prefix and limit to keys already ordered in scan direction
    pub(crate) fn collect<I>(&self, keys: I) -> Result<Vec<Vec<u8>>>
    where
        I: Iterator<Item = Result<Vec<u8>>>,
    {
        let mut out = Vec::new();
        for key in keys {
            if out.len() >= self.limit {
                break;
            }
            let key = key?;
            if !key.starts_with(self.prefix) {
                break;
            }
            out.push(key);
        }
        Ok(out)
    }
}

// =============================================================================
// Maintenance
// =============================================================================

/// Space usage reported by an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSize {
    /// Bytes of live keys and values
    pub stored_bytes: u64,
    /// Bytes of engine bookkeeping (trees, allocator state)
    pub metadata_bytes: u64,
    /// Bytes allocated but no longer reachable
    pub fragmented_bytes: u64,
}

impl EngineSize {
    pub fn total_bytes(&self) -> u64 {
        self.stored_bytes + self.metadata_bytes + self.fragmented_bytes
    }

    /// Share of the total that is garbage (0.0 for an empty engine)
    pub fn fragmented_ratio(&self) -> f64 {
        match self.total_bytes() {
            0 => 0.0,
            total => self.fragmented_bytes as f64 / total as f64,
        }
    }
}

/// Result of a garbage collection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcOutcome {
    /// Space was rewritten and reclaimed
    Rewritten,
    /// Nothing worth rewriting
    NoRewrite,
}

/// Discard ratios must lie strictly between 0 and 1
pub(crate) fn validate_discard_ratio(discard_ratio: f64) -> Result<()> {
    if discard_ratio > 0.0 && discard_ratio < 1.0 {
        Ok(())
    } else {
        Err(StoreError::Config(format!(
            "discard ratio must be in (0.0, 1.0), got {}",
            discard_ratio
        )))
    }
}
