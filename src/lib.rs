//! # atlas-raftstore
//!
//! Durable storage for a replicated consensus log:
//! - Log store: entries keyed by index, atomic batch append, batched range delete
//! - Stable store: small facts (term, vote) that must survive restarts
//! - One ordered keyspace with ACID transactions underneath both
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Consensus Module                          │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ LogStore                     │ StableStore
//! ┌──────────────▼──────────────┐ ┌─────────────▼───────────────┐
//! │          RaftLog            │ │          StableKv           │
//! │  (codec, RangeDelete)       │ │     (uint64 helpers)        │
//! └──────────────┬──────────────┘ └─────────────┬───────────────┘
//!                │        Keyspace ("logs" / "conf")            │
//!                └──────────────┬───────────────┘
//!                               ▼
//!                      ┌─────────────────┐
//!                      │  StorageEngine  │
//!                      │ (redb / memory) │
//!                      └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use atlas_raftstore::{LogRecord, LogStore, RaftStore, StableStore};
//!
//! let store = RaftStore::open_path("./raftstore_data")?;
//! store.store_logs(&[LogRecord::new(1, 1, &b"set x=1"[..])])?;
//! store.set_uint64(b"CurrentTerm", 1)?;
//! assert_eq!(store.last_index()?, 1);
//! store.close()?;
//! # Ok::<(), atlas_raftstore::StoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keyspace;
pub mod codec;
pub mod engine;
pub mod log_store;
pub mod stable_store;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, ConfigBuilder};
pub use codec::{LogKind, LogRecord, TimeFormat};
pub use engine::{EngineSize, GcOutcome, MemoryEngine, RedbEngine, StorageEngine};
pub use keyspace::Namespace;
pub use log_store::{LogStore, RaftLog, RangeDelete};
pub use stable_store::{StableKv, StableStore};
pub use store::RaftStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of atlas-raftstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
