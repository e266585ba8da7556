//! A terminal adapter implementing [`Database`] against a disk-resident
//! binary key/value engine. Optional: most chains run purely in memory.
//!
//! Grounded on `original_source/src/pluginplay/cache/database/rocksdb/`,
//! which is the one concrete backend the original ships. `rocksdb` is
//! also the storage engine the wider retrieved corpus reaches for
//! (`aptos-core`'s `storage/schemadb`), so it's the natural default here
//! rather than inventing a bespoke format.

use super::{DbValue, Database};
use crate::error::{BackendError, CacheError, Result};
use std::borrow::Cow;

/// A binary-key, binary-value adapter backed by an on-disk engine. The
/// only requirement spec.md §4.5 places on it: atomic per-operation,
/// no transaction API exposed.
pub trait ExternalBackend: Database<Vec<u8>, Vec<u8>> {}

impl<T: Database<Vec<u8>, Vec<u8>>> ExternalBackend for T {}

#[cfg(feature = "rocksdb-backend")]
pub struct RocksDbBackend {
    db: rocksdb::DB,
}

#[cfg(feature = "rocksdb-backend")]
impl RocksDbBackend {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = rocksdb::DB::open(&opts, path)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))?;
        Ok(Self { db })
    }
}

#[cfg(feature = "rocksdb-backend")]
impl Database<Vec<u8>, Vec<u8>> for RocksDbBackend {
    fn contains(&self, key: &Vec<u8>) -> bool {
        matches!(self.db.get(key), Ok(Some(_)))
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))
    }

    fn remove(&mut self, key: &Vec<u8>) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))
    }

    fn get(&self, key: &Vec<u8>) -> Result<DbValue<'_, Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))?
            .map(Cow::Owned)
            .ok_or(CacheError::Empty("rocksdb key"))
    }

    fn checkpoint(&mut self) -> Result<()> {
        // RocksDB persists on every `put`; nothing further to flush here
        // beyond what the engine already guarantees per-operation.
        Ok(())
    }

    fn dump(&mut self) -> Result<()> {
        self.checkpoint()
    }
}
