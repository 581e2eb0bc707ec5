//! Redb engine
//!
//! Durable backend: one redb file holding a single `&[u8] -> &[u8]` table.
//! Both namespaces live in that table, so first/last discovery and range
//! deletes are plain ordered scans over it.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use redb::{Database, Durability, ReadableTable, TableDefinition};

use crate::config::Config;
use crate::error::{Result, StoreError};

use super::{
    validate_discard_ratio, Direction, EngineSize, GcOutcome, PrefixScan, ReadTransaction,
    StorageEngine, WriteTransaction,
};

/// The shared ordered keyspace
const KEYSPACE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("keyspace");

macro_rules! engine_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(e: $source) -> Self {
                    StoreError::Engine(e.to_string())
                }
            }
        )*
    };
}

engine_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    redb::CompactionError,
);

/// redb-backed engine
///
/// ## Concurrency
/// - Readers run on MVCC snapshots and never block
/// - redb admits one write transaction at a time; others wait in `begin_write`
/// - The `RwLock` only guards the handle itself: transactions take it shared
///   for the duration of `begin_*`, compaction takes it exclusive
pub struct RedbEngine {
    db: RwLock<Database>,

    /// Path of the database file
    path: PathBuf,

    /// Commit without fsync
    no_sync: bool,
}

impl RedbEngine {
    /// Open or create the database file at `path`
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let db = Database::builder()
            .set_cache_size(config.cache_size)
            .create(&path)?;

        // Create the keyspace table up front so read transactions can always open it
        let txn = db.begin_write()?;
        txn.open_table(KEYSPACE)?;
        txn.commit()?;

        tracing::info!(path = %path.display(), no_sync = config.no_sync, "opened redb engine");

        Ok(Self {
            db: RwLock::new(db),
            path,
            no_sync: config.no_sync,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageEngine for RedbEngine {
    type Read = RedbReadTxn;
    type Write = RedbWriteTxn;

    fn begin_read(&self) -> Result<Self::Read> {
        let txn = self.db.read().begin_read()?;
        Ok(RedbReadTxn { txn })
    }

    fn begin_write(&self) -> Result<Self::Write> {
        let mut txn = self.db.read().begin_write()?;
        if self.no_sync {
            txn.set_durability(Durability::None);
        }
        Ok(RedbWriteTxn { txn })
    }

    fn size(&self) -> Result<EngineSize> {
        let txn = self.db.read().begin_write()?;
        let stats = txn.stats()?;
        txn.abort()?;

        Ok(EngineSize {
            stored_bytes: stats.stored_bytes(),
            metadata_bytes: stats.metadata_bytes(),
            fragmented_bytes: stats.fragmented_bytes(),
        })
    }

    fn run_value_log_gc(&self, discard_ratio: f64) -> Result<GcOutcome> {
        validate_discard_ratio(discard_ratio)?;

        let size = self.size()?;
        let ratio = size.fragmented_ratio();
        if ratio < discard_ratio {
            tracing::debug!(ratio, discard_ratio, "skipping compaction");
            return Ok(GcOutcome::NoRewrite);
        }

        // Fails with an engine error while any transaction is still open
        let compacted = self.db.write().compact()?;
        tracing::info!(
            ratio,
            compacted,
            fragmented_bytes = size.fragmented_bytes,
            "compaction finished"
        );

        Ok(if compacted {
            GcOutcome::Rewritten
        } else {
            GcOutcome::NoRewrite
        })
    }

    fn close(self) -> Result<()> {
        drop(self.db.into_inner());
        tracing::info!(path = %self.path.display(), "closed redb engine");
        Ok(())
    }
}

fn scan_table<T>(table: &T, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let range = table.range::<&[u8]>(scan.bounds())?;
    let keys = range.map(|item| {
        item.map(|(key, _)| key.value().to_vec())
            .map_err(StoreError::from)
    });
    match scan.direction {
        Direction::Forward => scan.collect(keys),
        Direction::Reverse => scan.collect(keys.rev()),
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Read-only redb transaction
pub struct RedbReadTxn {
    txn: redb::ReadTransaction,
}

impl ReadTransaction for RedbReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.txn.open_table(KEYSPACE)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn scan_keys(&self, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>> {
        let table = self.txn.open_table(KEYSPACE)?;
        scan_table(&table, scan)
    }
}

/// Read-write redb transaction
pub struct RedbWriteTxn {
    txn: redb::WriteTransaction,
}

impl ReadTransaction for RedbWriteTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.txn.open_table(KEYSPACE)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn scan_keys(&self, scan: &PrefixScan<'_>) -> Result<Vec<Vec<u8>>> {
        let table = self.txn.open_table(KEYSPACE)?;
        scan_table(&table, scan)
    }
}

impl WriteTransaction for RedbWriteTxn {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut table = self.txn.open_table(KEYSPACE)?;
        table.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let mut table = self.txn.open_table(KEYSPACE)?;
        table.remove(key)?;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    fn discard(self) {
        if let Err(e) = self.txn.abort() {
            tracing::warn!("Failed to discard write transaction: {}", e);
        }
    }
}
