//! Stable Store
//!
//! Small durable facts a consensus module must not lose: current term, last
//! vote, cluster configuration. Values live under the `conf` namespace of the
//! same keyspace as the log.

use std::sync::Arc;

use crate::engine::{ReadTransaction, StorageEngine, WriteTransaction};
use crate::error::{Result, StoreError};
use crate::keyspace::EngineKey;

/// Key/value storage as seen by a consensus module
pub trait StableStore {
    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Owned copy of the value; `KeyNotFound` when absent or empty
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Store `value` as 8 big-endian bytes
    fn set_uint64(&self, key: &[u8], value: u64) -> Result<()> {
        self.set(key, &value.to_be_bytes())
    }

    /// Read a value written by `set_uint64`
    fn get_uint64(&self, key: &[u8]) -> Result<u64> {
        let value = self.get(key)?;
        let raw: [u8; 8] = value.as_slice().try_into().map_err(|_| {
            StoreError::Decode(format!("uint64 value must be 8 bytes, got {}", value.len()))
        })?;
        Ok(u64::from_be_bytes(raw))
    }
}

/// [`StableStore`] over a shared engine handle
pub struct StableKv<E: StorageEngine> {
    engine: Arc<E>,
}

impl<E: StorageEngine> StableKv<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}

impl<E: StorageEngine> StableStore for StableKv<E> {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut txn = self.engine.begin_write()?;
        if let Err(e) = txn.set(&EngineKey::Conf(key).to_bytes(), value) {
            txn.discard();
            return Err(e);
        }
        txn.commit()
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        tracing::trace!(key = %String::from_utf8_lossy(key), "stable get");
        let txn = self.engine.begin_read()?;

        match txn.get(&EngineKey::Conf(key).to_bytes())? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StoreError::KeyNotFound),
        }
    }
}
