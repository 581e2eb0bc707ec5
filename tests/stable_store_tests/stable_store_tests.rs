//! Tests for the stable store
//!
//! These tests verify:
//! - Byte and uint64 round-trips
//! - NotFound for missing and empty values
//! - Isolation from the log namespace
//! - Persistence across reopen

use std::sync::Arc;
use std::thread;

use atlas_raftstore::{
    Config, LogRecord, LogStore, MemoryEngine, RaftStore, StableKv, StableStore, StoreError,
};
use proptest::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, RaftStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = RaftStore::open_path(temp_dir.path()).unwrap();
    (temp_dir, store)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_scenario_missing_key_then_uint64() {
    let (_temp, store) = setup_temp_store();

    assert!(matches!(store.get(b"never-set"), Err(StoreError::KeyNotFound)));
    assert!(store.get_uint64(b"never-set").unwrap_err().is_not_found());

    store.set_uint64(b"x", 123).unwrap();
    assert_eq!(store.get_uint64(b"x").unwrap(), 123);
}

#[test]
fn test_uint64_extremes() {
    let (_temp, store) = setup_temp_store();

    store.set_uint64(b"zero", 0).unwrap();
    store.set_uint64(b"max", u64::MAX).unwrap();

    assert_eq!(store.get_uint64(b"zero").unwrap(), 0);
    assert_eq!(store.get_uint64(b"max").unwrap(), u64::MAX);
}

#[test]
fn test_uint64_is_big_endian_bytes() {
    let (_temp, store) = setup_temp_store();
    store.set_uint64(b"term", 0x0102).unwrap();
    assert_eq!(store.get(b"term").unwrap(), vec![0, 0, 0, 0, 0, 0, 1, 2]);
}

#[test]
fn test_set_overwrites() {
    let (_temp, store) = setup_temp_store();
    store.set(b"LastVoteCand", b"node-1").unwrap();
    store.set(b"LastVoteCand", b"node-2").unwrap();
    assert_eq!(store.get(b"LastVoteCand").unwrap(), b"node-2");
}

#[test]
fn test_empty_value_reads_as_not_found() {
    let (_temp, store) = setup_temp_store();
    store.set(b"k", b"").unwrap();
    assert!(matches!(store.get(b"k"), Err(StoreError::KeyNotFound)));
}

#[test]
fn test_non_uint64_value_is_decode_error() {
    let (_temp, store) = setup_temp_store();
    store.set(b"k", b"not eight bytes").unwrap();
    assert!(matches!(store.get_uint64(b"k"), Err(StoreError::Decode(_))));
}

#[test]
fn test_empty_key_is_allowed() {
    let (_temp, store) = setup_temp_store();
    store.set(b"", b"root").unwrap();
    assert_eq!(store.get(b"").unwrap(), b"root");
}

// =============================================================================
// Namespace Isolation Tests
// =============================================================================

#[test]
fn test_conf_key_shaped_like_log_key() {
    let (_temp, store) = setup_temp_store();

    // Same logical bytes as the index-1 log key's suffix
    store.set(&1u64.to_be_bytes(), b"conf value").unwrap();
    store.store_log(&LogRecord::new(1, 1, &b"log value"[..])).unwrap();

    assert_eq!(store.get(&1u64.to_be_bytes()).unwrap(), b"conf value");
    assert_eq!(&store.get_log(1).unwrap().data[..], b"log value");

    store.delete_range(0, u64::MAX).unwrap();
    assert_eq!(store.get(&1u64.to_be_bytes()).unwrap(), b"conf value");
}

// =============================================================================
// Persistence and Concurrency Tests
// =============================================================================

#[test]
fn test_values_persist_across_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = RaftStore::open_path(temp_dir.path()).unwrap();
        store.set_uint64(b"CurrentTerm", 17).unwrap();
        store.set(b"LastVoteCand", b"node-3").unwrap();
        store.close().unwrap();
    }

    let store = RaftStore::open_path(temp_dir.path()).unwrap();
    assert_eq!(store.get_uint64(b"CurrentTerm").unwrap(), 17);
    assert_eq!(store.get(b"LastVoteCand").unwrap(), b"node-3");
}

#[test]
fn test_concurrent_setters_on_distinct_keys() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..20u64 {
                    let key = format!("t{}-{}", t, i);
                    store.set_uint64(key.as_bytes(), t * 100 + i).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4u64 {
        for i in 0..20u64 {
            let key = format!("t{}-{}", t, i);
            assert_eq!(store.get_uint64(key.as_bytes()).unwrap(), t * 100 + i);
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn bytes_round_trip(
        key in prop::collection::vec(any::<u8>(), 0..32),
        value in prop::collection::vec(any::<u8>(), 1..256),
    ) {
        let stable = StableKv::new(Arc::new(MemoryEngine::new()));
        stable.set(&key, &value).unwrap();
        prop_assert_eq!(stable.get(&key).unwrap(), value);
    }

    #[test]
    fn uint64_round_trip(key in prop::collection::vec(any::<u8>(), 0..32), n: u64) {
        let stable = StableKv::new(Arc::new(MemoryEngine::new()));
        stable.set_uint64(&key, n).unwrap();
        prop_assert_eq!(stable.get_uint64(&key).unwrap(), n);
    }
}

#[test]
fn test_injected_engine_has_no_data_dir() {
    let store = RaftStore::with_engine(MemoryEngine::new(), &Config::default()).unwrap();
    store.set_uint64(b"k", 1).unwrap();
    assert!(store.data_dir().as_os_str().is_empty());
    store.close().unwrap();
}
