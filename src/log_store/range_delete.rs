//! Batched range deletion
//!
//! Deleting a large span of the log in one transaction can exceed what the
//! engine is willing to buffer, so the span is removed in bounded batches,
//! each committed on its own.
//!
//! ## Progress
//! ```text
//! cursor ──► [k1 k2 ... kB] ──► commit ──► cursor = k_B ++ 0x00 ──► ...
//!                                                  │
//!            batch with zero deletable keys ◄──────┘  => finished
//! ```
//!
//! A crash between batches leaves a prefix of the range deleted. Running the
//! same range again picks up where the committed batches stopped.

use crate::engine::{PrefixScan, ReadTransaction, StorageEngine, WriteTransaction};
use crate::error::Result;
use crate::keyspace::{key_after, log_index_of, EngineKey, Namespace};

/// What a single step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A batch was deleted and committed
    Committed { deleted: usize },
    /// Nothing left in range; the machine is done
    Finished,
}

/// Resumable deletion of the inclusive index range `[min, max]`
#[derive(Debug, Clone)]
pub struct RangeDelete {
    /// Next engine key to scan from
    cursor: Vec<u8>,
    max: u64,
    batch_size: usize,
    deleted: u64,
    batches: u64,
    finished: bool,
}

impl RangeDelete {
    /// A zero batch size is treated as 1.
    pub fn new(min: u64, max: u64, batch_size: usize) -> Self {
        Self {
            cursor: EngineKey::Log(min).to_bytes(),
            max,
            batch_size: batch_size.max(1),
            deleted: 0,
            batches: 0,
            finished: false,
        }
    }

    /// Delete and commit one batch.
    ///
    /// On error the batch's transaction is discarded and the cursor is left
    /// where it was, so the same step can be retried.
    pub fn step<E: StorageEngine>(&mut self, engine: &E) -> Result<BatchOutcome> {
        if self.finished {
            return Ok(BatchOutcome::Finished);
        }

        let mut txn = engine.begin_write()?;
        let batch = match self.delete_batch(&mut txn) {
            Ok(batch) => batch,
            Err(e) => {
                txn.discard();
                return Err(e);
            }
        };

        let Some((deleted, last_key)) = batch else {
            txn.discard();
            self.finished = true;
            tracing::debug!(
                batches = self.batches,
                deleted = self.deleted,
                "range delete finished"
            );
            return Ok(BatchOutcome::Finished);
        };

        txn.commit()?;

        self.cursor = key_after(&last_key);
        self.deleted += deleted as u64;
        self.batches += 1;
        tracing::debug!(batch = self.batches, deleted, max = self.max, "range delete batch committed");

        Ok(BatchOutcome::Committed { deleted })
    }

    /// Step until finished, returning the total number of deleted entries
    pub fn run<E: StorageEngine>(&mut self, engine: &E) -> Result<u64> {
        while self.step(engine)? != BatchOutcome::Finished {}
        Ok(self.deleted)
    }

    /// Delete up to `batch_size` keys from the cursor.
    ///
    /// Returns the count and the last deleted key, or `None` when no key in
    /// range remains.
    fn delete_batch<T: WriteTransaction>(&self, txn: &mut T) -> Result<Option<(usize, Vec<u8>)>> {
        let scan = PrefixScan::forward(Namespace::Logs.prefix(), &self.cursor).limit(self.batch_size);
        let keys = txn.scan_keys(&scan)?;

        let mut deleted = 0;
        let mut last_key = None;
        for key in keys {
            if log_index_of(&key)? > self.max {
                break;
            }
            txn.delete(&key)?;
            deleted += 1;
            last_key = Some(key);
        }

        Ok(last_key.map(|key| (deleted, key)))
    }

    /// Engine key the next step scans from
    pub fn cursor(&self) -> &[u8] {
        &self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Entries deleted by committed batches so far
    pub fn total_deleted(&self) -> u64 {
        self.deleted
    }

    /// Batches committed so far
    pub fn batches(&self) -> u64 {
        self.batches
    }
}
