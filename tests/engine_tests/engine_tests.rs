//! Tests for the storage engines
//!
//! These tests verify, for both the redb and in-memory engines:
//! - Point get/set/delete inside transactions
//! - Commit and discard semantics
//! - Prefix scans in both directions
//! - Persistence across reopen (redb)
//! - Size reporting and compaction requests

use std::sync::Arc;
use std::thread;

use atlas_raftstore::engine::{
    GcOutcome, MemoryEngine, PrefixScan, ReadTransaction, RedbEngine, StorageEngine,
    WriteTransaction,
};
use atlas_raftstore::{Config, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_redb() -> (TempDir, RedbEngine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = RedbEngine::open(temp_dir.path().join("raft.redb"), &Config::default()).unwrap();
    (temp_dir, engine)
}

fn put_all<E: StorageEngine>(engine: &E, keys: &[&[u8]]) {
    let mut txn = engine.begin_write().unwrap();
    for key in keys {
        txn.set(key, b"v").unwrap();
    }
    txn.commit().unwrap();
}

fn keyspace() -> [&'static [u8]; 6] {
    [b"conf1", b"conf2", b"logs1", b"logs2", b"logs3", b"zzzz"]
}

// =============================================================================
// Shared Behaviour (run against every engine)
// =============================================================================

fn check_point_operations<E: StorageEngine>(engine: &E) {
    let mut txn = engine.begin_write().unwrap();
    txn.set(b"a", b"1").unwrap();
    txn.set(b"b", b"2").unwrap();
    txn.delete(b"b").unwrap();
    txn.delete(b"never-written").unwrap();
    txn.commit().unwrap();

    let read = engine.begin_read().unwrap();
    assert_eq!(read.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(read.get(b"b").unwrap(), None);
}

fn check_overwrite<E: StorageEngine>(engine: &E) {
    put_all(engine, &[b"k"]);
    let mut txn = engine.begin_write().unwrap();
    txn.set(b"k", b"newer").unwrap();
    txn.commit().unwrap();

    assert_eq!(engine.begin_read().unwrap().get(b"k").unwrap(), Some(b"newer".to_vec()));
}

fn check_discard<E: StorageEngine>(engine: &E) {
    let mut txn = engine.begin_write().unwrap();
    txn.set(b"discarded", b"v").unwrap();
    txn.discard();

    assert_eq!(engine.begin_read().unwrap().get(b"discarded").unwrap(), None);
}

fn check_forward_scan<E: StorageEngine>(engine: &E) {
    put_all(engine, &keyspace());
    let read = engine.begin_read().unwrap();

    let keys = read.scan_keys(&PrefixScan::forward(b"logs", b"logs")).unwrap();
    assert_eq!(keys, vec![b"logs1".to_vec(), b"logs2".to_vec(), b"logs3".to_vec()]);

    let keys = read.scan_keys(&PrefixScan::forward(b"logs", b"logs2")).unwrap();
    assert_eq!(keys, vec![b"logs2".to_vec(), b"logs3".to_vec()]);

    let keys = read.scan_keys(&PrefixScan::forward(b"logs", b"logs").limit(2)).unwrap();
    assert_eq!(keys.len(), 2);

    let keys = read.scan_keys(&PrefixScan::forward(b"nope", b"nope")).unwrap();
    assert!(keys.is_empty());
}

fn check_reverse_scan<E: StorageEngine>(engine: &E) {
    put_all(engine, &keyspace());
    let read = engine.begin_read().unwrap();

    let keys = read.scan_keys(&PrefixScan::reverse(b"logs", Some(&b"logt"[..])).limit(1)).unwrap();
    assert_eq!(keys, vec![b"logs3".to_vec()]);

    let keys = read.scan_keys(&PrefixScan::reverse(b"logs", Some(&b"logs2"[..]))).unwrap();
    assert_eq!(keys, vec![b"logs2".to_vec(), b"logs1".to_vec()]);

    // From the end of the keyspace the first key seen is "zzzz", outside the prefix
    let keys = read.scan_keys(&PrefixScan::reverse(b"logs", None)).unwrap();
    assert!(keys.is_empty());
}

fn check_write_sees_own_writes<E: StorageEngine>(engine: &E) {
    let mut txn = engine.begin_write().unwrap();
    txn.set(b"logs9", b"v").unwrap();
    assert_eq!(txn.get(b"logs9").unwrap(), Some(b"v".to_vec()));
    let keys = txn.scan_keys(&PrefixScan::forward(b"logs", b"logs")).unwrap();
    assert_eq!(keys, vec![b"logs9".to_vec()]);
    txn.discard();
}

fn check_gc_ratio_validation<E: StorageEngine>(engine: &E) {
    assert!(matches!(engine.run_value_log_gc(0.0), Err(StoreError::Config(_))));
    assert!(matches!(engine.run_value_log_gc(1.0), Err(StoreError::Config(_))));
    assert!(matches!(engine.run_value_log_gc(-0.5), Err(StoreError::Config(_))));
    assert!(engine.run_value_log_gc(0.5).is_ok());
}

macro_rules! engine_suite {
    ($($name:ident => $check:ident),* $(,)?) => {
        mod redb_suite {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let (_temp, engine) = setup_temp_redb();
                    $check(&engine);
                }
            )*
        }

        mod memory_suite {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let engine = MemoryEngine::new();
                    $check(&engine);
                }
            )*
        }
    };
}

engine_suite!(
    test_point_operations => check_point_operations,
    test_overwrite => check_overwrite,
    test_discard => check_discard,
    test_forward_scan => check_forward_scan,
    test_reverse_scan => check_reverse_scan,
    test_write_sees_own_writes => check_write_sees_own_writes,
    test_gc_ratio_validation => check_gc_ratio_validation,
);

// =============================================================================
// Redb-specific Tests
// =============================================================================

#[test]
fn test_redb_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raft.redb");

    {
        let engine = RedbEngine::open(&path, &Config::default()).unwrap();
        put_all(&engine, &[b"logs1", b"conf1"]);
        engine.close().unwrap();
    }

    let engine = RedbEngine::open(&path, &Config::default()).unwrap();
    let read = engine.begin_read().unwrap();
    assert_eq!(read.get(b"logs1").unwrap(), Some(b"v".to_vec()));
    assert_eq!(read.get(b"conf1").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_redb_discarded_writes_do_not_persist() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raft.redb");

    {
        let engine = RedbEngine::open(&path, &Config::default()).unwrap();
        let mut txn = engine.begin_write().unwrap();
        txn.set(b"logs1", b"v").unwrap();
        txn.discard();
        engine.close().unwrap();
    }

    let engine = RedbEngine::open(&path, &Config::default()).unwrap();
    assert_eq!(engine.begin_read().unwrap().get(b"logs1").unwrap(), None);
}

#[test]
fn test_redb_size_grows_with_data() {
    let (_temp, engine) = setup_temp_redb();
    let before = engine.size().unwrap();

    let mut txn = engine.begin_write().unwrap();
    for i in 0u32..1_000 {
        txn.set(&i.to_be_bytes(), &[0xAB; 128]).unwrap();
    }
    txn.commit().unwrap();

    let after = engine.size().unwrap();
    assert!(after.stored_bytes > before.stored_bytes);
    assert!(after.stored_bytes >= 1_000 * 128);
}

#[test]
fn test_redb_compaction_after_mass_delete() {
    let (_temp, engine) = setup_temp_redb();

    let mut txn = engine.begin_write().unwrap();
    for i in 0u32..2_000 {
        txn.set(&i.to_be_bytes(), &[0xCD; 256]).unwrap();
    }
    txn.commit().unwrap();

    let mut txn = engine.begin_write().unwrap();
    for i in 0u32..2_000 {
        txn.delete(&i.to_be_bytes()).unwrap();
    }
    txn.commit().unwrap();

    let outcome = engine.run_value_log_gc(0.01).unwrap();
    assert!(matches!(outcome, GcOutcome::Rewritten | GcOutcome::NoRewrite));
    assert!(engine.begin_read().unwrap().get(&0u32.to_be_bytes()).unwrap().is_none());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_redb_concurrent_writers_are_serialized() {
    let (_temp, engine) = setup_temp_redb();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8u64)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..25 {
                    let mut txn = engine.begin_write().unwrap();
                    let current = txn
                        .get(b"counter")
                        .unwrap()
                        .map(|v| u64::from_be_bytes(v.try_into().unwrap()))
                        .unwrap_or(0);
                    txn.set(b"counter", &(current + 1).to_be_bytes()).unwrap();
                    txn.commit().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let value = engine.begin_read().unwrap().get(b"counter").unwrap().unwrap();
    assert_eq!(u64::from_be_bytes(value.try_into().unwrap()), 200);
}

#[test]
fn test_memory_readers_see_snapshots() {
    let engine = MemoryEngine::new();
    put_all(&engine, &[b"logs1"]);
    let snapshot = engine.begin_read().unwrap();

    let mut txn = engine.begin_write().unwrap();
    txn.delete(b"logs1").unwrap();
    txn.commit().unwrap();

    assert_eq!(snapshot.get(b"logs1").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.begin_read().unwrap().get(b"logs1").unwrap(), None);
}
