//! Log Store Module
//!
//! Ordered, durable storage of consensus log entries keyed by index.
//!
//! ## Responsibilities
//! - Report the first and last stored index (0 when empty)
//! - Point lookup of a single entry
//! - Atomic append of one or many entries
//! - Inclusive range deletion in bounded batches ([`RangeDelete`])
//!
//! Nothing is cached: every call re-derives its answer from the engine.

mod range_delete;

use std::slice;
use std::sync::Arc;

use crate::codec::{self, LogRecord, TimeFormat};
use crate::config::Config;
use crate::engine::{PrefixScan, ReadTransaction, StorageEngine, WriteTransaction};
use crate::error::{Result, StoreError};
use crate::keyspace::{log_index_of, EngineKey, Namespace};

pub use range_delete::{BatchOutcome, RangeDelete};

/// Keys deleted per transaction by `delete_range` unless configured otherwise
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 100;

/// Log storage as seen by a consensus module
pub trait LogStore {
    /// Lowest stored index, or 0 when the log is empty
    fn first_index(&self) -> Result<u64>;

    /// Highest stored index, or 0 when the log is empty
    fn last_index(&self) -> Result<u64>;

    /// Entry at `index`; `LogNotFound` when absent
    fn get_log(&self, index: u64) -> Result<LogRecord>;

    /// Store a single record
    fn store_log(&self, record: &LogRecord) -> Result<()> {
        self.store_logs(slice::from_ref(record))
    }

    /// Store every record or none of them
    fn store_logs(&self, records: &[LogRecord]) -> Result<()>;

    /// Delete every entry with `min <= index <= max`
    fn delete_range(&self, min: u64, max: u64) -> Result<()>;
}

/// [`LogStore`] over a shared engine handle
pub struct RaftLog<E: StorageEngine> {
    engine: Arc<E>,
    time_format: TimeFormat,
    delete_batch_size: usize,
}

impl<E: StorageEngine> RaftLog<E> {
    pub fn new(engine: Arc<E>, config: &Config) -> Self {
        Self {
            engine,
            time_format: config.time_format,
            delete_batch_size: config.delete_batch_size,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Build the state machine behind `delete_range` for manual stepping
    pub fn range_delete(&self, min: u64, max: u64) -> RangeDelete {
        RangeDelete::new(min, max, self.delete_batch_size)
    }

    fn write_records(&self, txn: &mut E::Write, records: &[LogRecord]) -> Result<()> {
        for record in records {
            let value = codec::encode(record, self.time_format)?;
            txn.set(&EngineKey::Log(record.index).to_bytes(), &value)?;
        }
        Ok(())
    }
}

impl<E: StorageEngine> LogStore for RaftLog<E> {
    fn first_index(&self) -> Result<u64> {
        let txn = self.engine.begin_read()?;
        let prefix = Namespace::Logs.prefix();
        let keys = txn.scan_keys(&PrefixScan::forward(prefix, prefix).limit(1))?;

        match keys.first() {
            Some(key) => log_index_of(key),
            None => Ok(0),
        }
    }

    fn last_index(&self) -> Result<u64> {
        let txn = self.engine.begin_read()?;
        let bound = Namespace::Logs.upper_bound();
        let scan = PrefixScan::reverse(Namespace::Logs.prefix(), bound.as_deref()).limit(1);
        let keys = txn.scan_keys(&scan)?;

        match keys.first() {
            Some(key) => log_index_of(key),
            None => Ok(0),
        }
    }

    fn get_log(&self, index: u64) -> Result<LogRecord> {
        tracing::trace!(index, "get_log");
        let txn = self.engine.begin_read()?;

        match txn.get(&EngineKey::Log(index).to_bytes())? {
            Some(value) if !value.is_empty() => codec::decode(&value),
            _ => Err(StoreError::LogNotFound),
        }
    }

    fn store_logs(&self, records: &[LogRecord]) -> Result<()> {
        let mut txn = self.engine.begin_write()?;

        if let Err(e) = self.write_records(&mut txn, records) {
            txn.discard();
            return Err(e);
        }
        txn.commit()?;

        tracing::debug!(
            count = records.len(),
            first = records.first().map(|r| r.index),
            last = records.last().map(|r| r.index),
            "stored logs"
        );
        Ok(())
    }

    fn delete_range(&self, min: u64, max: u64) -> Result<()> {
        let deleted = self.range_delete(min, max).run(self.engine.as_ref())?;
        tracing::debug!(min, max, deleted, "deleted log range");
        Ok(())
    }
}
