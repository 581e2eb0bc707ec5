//! Keyspace Module
//!
//! Maps log indices and stable-store keys onto the single ordered keyspace
//! shared by both stores.
//!
//! ## Key Layout
//! ```text
//! ┌──────────────────┬──────────────────────────────────┐
//! │ "logs" (4)       │ index: u64 big-endian (8)        │
//! ├──────────────────┼──────────────────────────────────┤
//! │ "conf" (4)       │ caller key (variable)            │
//! └──────────────────┴──────────────────────────────────┘
//! ```
//!
//! Fixed-width big-endian indices make byte order equal numeric order, so a
//! forward scan of the `logs` prefix yields the first index and a reverse scan
//! from the prefix upper bound yields the last one.

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

/// Width of an encoded log index
pub const INDEX_LEN: usize = 8;

// =============================================================================
// Namespaces
// =============================================================================

/// Disjoint logical tables inside the flat engine keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Consensus log entries, keyed by index
    Logs,
    /// Stable facts (term, vote, configuration), keyed by caller bytes
    Conf,
}

impl Namespace {
    /// Every namespace, in prefix order
    pub const ALL: [Namespace; 2] = [Namespace::Conf, Namespace::Logs];

    /// Literal key prefix of this namespace
    pub const fn prefix(self) -> &'static [u8] {
        match self {
            Namespace::Logs => b"logs",
            Namespace::Conf => b"conf",
        }
    }

    /// Human readable name, as printed by `atlas-raftstore-cli keys`
    pub fn name(self) -> &'static str {
        match self {
            Namespace::Logs => "logs",
            Namespace::Conf => "conf",
        }
    }

    /// Key sorting strictly after every key in this namespace
    pub fn upper_bound(self) -> Option<Vec<u8>> {
        upper_bound(self.prefix())
    }
}

const fn is_prefix_of(prefix: &[u8], key: &[u8]) -> bool {
    if prefix.len() > key.len() {
        return false;
    }
    let mut i = 0;
    while i < prefix.len() {
        if prefix[i] != key[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn namespaces_disjoint() -> bool {
    let all = Namespace::ALL;
    let mut i = 0;
    while i < all.len() {
        let mut j = 0;
        while j < all.len() {
            if i != j && is_prefix_of(all[i].prefix(), all[j].prefix()) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

// No namespace prefix may be a prefix of another, or scans would leak across tables.
const _: () = assert!(namespaces_disjoint(), "namespace prefixes overlap");

// =============================================================================
// Engine Keys
// =============================================================================

/// A key tagged with the namespace it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKey<'a> {
    /// Log entry at an index
    Log(u64),
    /// Stable-store entry under a caller key
    Conf(&'a [u8]),
}

impl<'a> EngineKey<'a> {
    pub fn namespace(&self) -> Namespace {
        match self {
            EngineKey::Log(_) => Namespace::Logs,
            EngineKey::Conf(_) => Namespace::Conf,
        }
    }

    /// Byte form stored in the engine
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            EngineKey::Log(index) => {
                let prefix = Namespace::Logs.prefix();
                let mut key = Vec::with_capacity(prefix.len() + INDEX_LEN);
                key.put_slice(prefix);
                key.put_u64(*index);
                key
            }
            EngineKey::Conf(logical) => derive_key(Namespace::Conf, logical),
        }
    }

    /// Recover the tagged form of a raw engine key
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        if let Some(rest) = raw.strip_prefix(Namespace::Logs.prefix()) {
            return decode_index(rest).map(EngineKey::Log);
        }
        if let Some(rest) = raw.strip_prefix(Namespace::Conf.prefix()) {
            return Ok(EngineKey::Conf(rest));
        }
        Err(StoreError::InvalidKey(format!(
            "key {:02x?} belongs to no namespace",
            raw
        )))
    }
}

/// Concatenate a namespace prefix and a logical key
pub fn derive_key(namespace: Namespace, logical: &[u8]) -> Vec<u8> {
    let prefix = namespace.prefix();
    let mut key = Vec::with_capacity(prefix.len() + logical.len());
    key.put_slice(prefix);
    key.put_slice(logical);
    key
}

/// Encode an index as 8 big-endian bytes
pub fn encode_index(index: u64) -> [u8; INDEX_LEN] {
    index.to_be_bytes()
}

/// Decode an index from exactly 8 big-endian bytes
pub fn decode_index(mut raw: &[u8]) -> Result<u64> {
    if raw.len() != INDEX_LEN {
        return Err(StoreError::InvalidKey(format!(
            "index must be {} bytes, got {}",
            INDEX_LEN,
            raw.len()
        )));
    }
    Ok(raw.get_u64())
}

/// Decode the index carried by a raw `logs` key
pub fn log_index_of(raw: &[u8]) -> Result<u64> {
    match EngineKey::parse(raw)? {
        EngineKey::Log(index) => Ok(index),
        EngineKey::Conf(_) => Err(StoreError::InvalidKey(
            "expected a key in the logs namespace".to_string(),
        )),
    }
}

// =============================================================================
// Ordering Helpers
// =============================================================================

/// Smallest key sorting strictly after every key that starts with `prefix`.
///
/// Increments the last byte below 0xFF and drops the 0xFF bytes after it.
/// Returns `None` when the prefix is empty or all 0xFF (no finite bound).
pub fn upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}

/// Smallest key sorting strictly after `key`
pub fn key_after(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.put_slice(key);
    next.put_u8(0);
    next
}
