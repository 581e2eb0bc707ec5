//! In-memory engine
//!
//! BTreeMap-based engine with snapshot reads and a single writer.
//!
//! ## Concurrency Model
//! - Readers clone an `Arc` to the current map: a consistent snapshot that
//!   never blocks on writers
//! - A write transaction holds the writer permit from begin to commit/discard,
//!   working on a private copy of the map
//! - Commit swaps the copy in as the new current map
//!
//! Every write transaction copies the whole committed map, so writes cost
//! O(n) in the number of stored keys. Fine for tests, not for real logs.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::Result;

use super::{
    validate_discard_ratio, Direction, EngineSize, GcOutcome, PrefixScan, ReadTransaction,
    StorageEngine, WriteTransaction,
};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Volatile engine; contents are lost when the last handle drops
#[derive(Default)]
pub struct MemoryEngine {
    /// Current committed map (swapped wholesale on commit)
    current: Arc<RwLock<Arc<Map>>>,

    /// Serializes write transactions
    writer: Arc<WriterSlot>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently committed
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    fn snapshot(&self) -> Arc<Map> {
        Arc::clone(&self.current.read())
    }
}

impl StorageEngine for MemoryEngine {
    type Read = MemoryReadTxn;
    type Write = MemoryWriteTxn;

    fn begin_read(&self) -> Result<Self::Read> {
        Ok(MemoryReadTxn {
            snapshot: self.snapshot(),
        })
    }

    fn begin_write(&self) -> Result<Self::Write> {
        // Lock before copying so the copy is the latest committed state
        let permit = self.writer.acquire();
        let working = (*self.snapshot()).clone();
        Ok(MemoryWriteTxn {
            _permit: permit,
            working,
            current: Arc::clone(&self.current),
        })
    }

    fn size(&self) -> Result<EngineSize> {
        let stored_bytes = self
            .snapshot()
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        Ok(EngineSize {
            stored_bytes,
            ..EngineSize::default()
        })
    }

    fn run_value_log_gc(&self, discard_ratio: f64) -> Result<GcOutcome> {
        validate_discard_ratio(discard_ratio)?;
        Ok(GcOutcome::NoRewrite)
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Writer Slot
// =============================================================================

/// One-writer-at-a-time gate, held across the life of a write transaction
#[derive(Default)]
struct WriterSlot {
    busy: Mutex<bool>,
    released: Condvar,
}

impl WriterSlot {
    fn acquire(self: &Arc<Self>) -> WriterPermit {
        let mut busy = self.busy.lock();
        while *busy {
            self.released.wait(&mut busy);
        }
        *busy = true;
        WriterPermit(Arc::clone(self))
    }
}

/// Releases the writer slot on drop (commit, discard or early return)
struct WriterPermit(Arc<WriterSlot>);

impl Drop for WriterPermit {
    fn drop(&mut self) {
        *self.0.busy.lock() = false;
        self.0.released.notify_one();
    }
}

fn scan_map(map: &Map, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>> {
    let range = map.range::<[u8], _>(scan.bounds());
    let keys = range.map(|(k, _)| Ok(k.clone()));
    match scan.direction {
        Direction::Forward => scan.collect(keys),
        Direction::Reverse => scan.collect(keys.rev()),
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Read-only view over a committed snapshot
pub struct MemoryReadTxn {
    snapshot: Arc<Map>,
}

impl ReadTransaction for MemoryReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot.get(key).cloned())
    }

    fn scan_keys(&self, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>> {
        scan_map(&self.snapshot, scan)
    }
}

/// Exclusive writer over a private copy of the map
pub struct MemoryWriteTxn {
    _permit: WriterPermit,
    working: Map,
    current: Arc<RwLock<Arc<Map>>>,
}

impl ReadTransaction for MemoryWriteTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.working.get(key).cloned())
    }

    fn scan_keys(&self, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>> {
        scan_map(&self.working, scan)
    }
}

impl WriteTransaction for MemoryWriteTxn {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.working.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.working.remove(key);
        Ok(())
    }

    fn commit(self) -> Result<()> {
        *self.current.write() = Arc::new(self.working);
        Ok(())
    }

    fn discard(self) {}
}
