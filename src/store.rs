//! RaftStore
//!
//! Owns the engine handle and wires both stores onto it.
//!
//! ## Responsibilities
//! - Open (or accept) the engine
//! - Share one engine handle between the log store and the stable store
//! - Pass maintenance requests (size, GC) through to the engine
//! - Close the engine exactly once

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::LogRecord;
use crate::config::Config;
use crate::engine::{EngineSize, GcOutcome, RedbEngine, StorageEngine};
use crate::error::{Result, StoreError};
use crate::log_store::{LogStore, RaftLog};
use crate::stable_store::{StableKv, StableStore};

/// Log store and stable store over a single engine
///
/// ## Concurrency
/// `RaftStore` adds no locking of its own. It is `Send + Sync` whenever the
/// engine is, and relies on the engine's snapshot reads and serialized writes.
/// `delete_range` commits batch by batch, so a concurrent reader may see a
/// range half deleted.
pub struct RaftStore<E: StorageEngine = RedbEngine> {
    log: RaftLog<E>,
    stable: StableKv<E>,

    /// Directory holding the engine's files (empty for injected engines)
    data_dir: PathBuf,
}

impl RaftStore<RedbEngine> {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DB_FILENAME: &'static str = "raft.redb";

    /// Open or create a store with the given config
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Reject unusable settings before touching the disk
        config.validate()?;

        // Step 2: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 3: Open the engine (creates the keyspace table on first open)
        let engine = RedbEngine::open(config.data_dir.join(Self::DB_FILENAME), &config)?;

        let mut store = Self::with_engine(engine, &config)?;
        store.data_dir = config.data_dir;
        Ok(store)
    }

    /// Open a store rooted at `path` with default settings
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().data_dir(path.as_ref()).build())
    }
}

impl<E: StorageEngine> RaftStore<E> {
    /// Build a store over an engine that is already open
    pub fn with_engine(engine: E, config: &Config) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(engine);
        Ok(Self {
            log: RaftLog::new(Arc::clone(&engine), config),
            stable: StableKv::new(engine),
            data_dir: PathBuf::new(),
        })
    }

    pub fn log(&self) -> &RaftLog<E> {
        &self.log
    }

    pub fn stable(&self) -> &StableKv<E> {
        &self.stable
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Space used by the engine
    pub fn size(&self) -> Result<EngineSize> {
        self.log.engine().size()
    }

    /// Ask the engine to reclaim space. Never invoked by the store itself.
    pub fn run_value_log_gc(&self, discard_ratio: f64) -> Result<GcOutcome> {
        self.log.engine().run_value_log_gc(discard_ratio)
    }

    /// Close the engine
    ///
    /// Fails with `EngineInUse` while another handle to the engine is alive.
    pub fn close(self) -> Result<()> {
        let Self { log, stable, .. } = self;
        drop(stable);

        let engine = Arc::clone(log.engine());
        drop(log);

        match Arc::try_unwrap(engine) {
            Ok(engine) => engine.close(),
            Err(_) => Err(StoreError::EngineInUse),
        }
    }
}

impl<E: StorageEngine> LogStore for RaftStore<E> {
    fn first_index(&self) -> Result<u64> {
        self.log.first_index()
    }

    fn last_index(&self) -> Result<u64> {
        self.log.last_index()
    }

    fn get_log(&self, index: u64) -> Result<LogRecord> {
        self.log.get_log(index)
    }

    fn store_logs(&self, records: &[LogRecord]) -> Result<()> {
        self.log.store_logs(records)
    }

    fn delete_range(&self, min: u64, max: u64) -> Result<()> {
        self.log.delete_range(min, max)
    }
}

impl<E: StorageEngine> StableStore for RaftStore<E> {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.stable.set(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.stable.get(key)
    }
}
