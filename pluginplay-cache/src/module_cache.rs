//! Component F — assembles a single module's full adapter chain from a
//! [`CacheConfig`] and exposes it as `Database<FieldMap, FieldMap>`:
//! proxied inputs in, proxied results out, memoization entirely hidden
//! behind the uniform interface spec.md §3.6 describes.
//!
//! The assembled chain, innermost first:
//!
//! ```text
//! InMemoryStore<Vec<u8>, Vec<u8>>  (+ optional ExternalBackend as backup)
//!   <- SerializingAdapter           (only when CacheConfig::serialize)
//!   <- KeyInjector                  (scopes the store by module uuid)
//!   <- KeyProxyMapper                (FieldMap key -> ProxyFieldMap key)
//!   <- ValueProxyMapper               (ProxyFieldMap value -> FieldMap value)
//! ```
//!
//! Alongside it, [`build_uuid_backup`] assembles spec.md §6's other on-disk
//! subtree: the shared value-to-uuid database backing every module's
//! [`ProxyMapMaker`] (via [`SharedUuidMapper`]), independent of any one
//! module's own `results` chain above.
//!
//! Grounded on `original_source/src/pluginplay/cache/database/
//! database_factory.cpp`, which wires together the equivalent chain from a
//! runtime config rather than requiring each call site to hand-assemble
//! adapters. The `local`/`sync` split mirrors the teacher's own
//! single-thread-vs-shared cache handles.

use crate::codec::BincodeCodec;
use crate::config::CacheConfig;
use crate::database::key_injector::KeyInjector;
use crate::database::key_proxy::KeyProxyMapper;
use crate::database::memory::InMemoryStore;
use crate::database::serializing::SerializingAdapter;
use crate::database::value_proxy::ValueProxyMapper;
use crate::database::Database;
use crate::error::Result;
use crate::field_map::FieldMap;
use crate::uuid_proxy::{self, ProxyFieldMap, ProxyMapMaker, SharedUuidMapper};
use std::sync::Arc;
use uuid::Uuid;

#[cfg(feature = "rocksdb-backend")]
use crate::database::external::RocksDbBackend;

type ProxyChain = Box<dyn Database<ProxyFieldMap, ProxyFieldMap> + Send>;

/// Opens an external, binary key/value store rooted at `root/<parts>`, or
/// `None` when no external backend is configured (or the `rocksdb-backend`
/// feature is off).
fn external_store(
    config: &CacheConfig,
    parts: &[&str],
) -> Option<Box<dyn Database<Vec<u8>, Vec<u8>> + Send>> {
    match &config.external_backend_root {
        None => None,
        #[cfg(feature = "rocksdb-backend")]
        Some(root) => {
            let mut path = root.clone();
            for part in parts {
                path = path.join(part);
            }
            Some(Box::new(
                RocksDbBackend::open(&path).expect("external backend root must be creatable"),
            ))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        Some(_) => {
            tracing::warn!(
                "CacheConfig::external_backend_root set but the `rocksdb-backend` feature is \
                 disabled; falling back to an in-memory-only store"
            );
            None
        }
    }
}

/// Builds the `ProxyFieldMap -> ProxyFieldMap` chain (everything below the
/// key/value proxy layers), scoped to `module_uuid` via [`KeyInjector`].
/// This is spec.md §6's "results" subtree, rooted at `root/results` when an
/// external backend is configured.
fn build_chain(config: &CacheConfig, module_uuid: Uuid) -> ProxyChain {
    if config.serialize {
        let backup = external_store(config, &["results"]);
        let bytes_store = match backup {
            Some(b) => InMemoryStore::<Vec<u8>, Vec<u8>>::with_backup(b),
            None => InMemoryStore::<Vec<u8>, Vec<u8>>::new(),
        };
        let serializing = SerializingAdapter::new(bytes_store, BincodeCodec);
        Box::new(KeyInjector::new("__module_uuid", module_uuid, serializing))
    } else {
        let store = InMemoryStore::<ProxyFieldMap, ProxyFieldMap>::new();
        Box::new(KeyInjector::new("__module_uuid", module_uuid, store))
    }
}

/// Builds spec.md §6's other on-disk subtree: the value-to-uuid database
/// shared by every module's [`ProxyMapMaker`]. Active whenever
/// `config.serialize` is set, independent of whether an external backend
/// is also configured — this lets the adapter chain (`SerializingAdapter`
/// over `BincodeCodec`) be exercised purely in memory.
fn build_uuid_backup(config: &CacheConfig) -> Option<uuid_proxy::UuidBackup> {
    if !config.serialize {
        return None;
    }
    let forward_store = match external_store(config, &["uuids", "forward"]) {
        Some(b) => InMemoryStore::<Vec<u8>, Vec<u8>>::with_backup(b),
        None => InMemoryStore::<Vec<u8>, Vec<u8>>::new(),
    };
    let reverse_store = match external_store(config, &["uuids", "reverse"]) {
        Some(b) => InMemoryStore::<Vec<u8>, Vec<u8>>::with_backup(b),
        None => InMemoryStore::<Vec<u8>, Vec<u8>>::new(),
    };
    Some(uuid_proxy::UuidBackup::new(
        Box::new(SerializingAdapter::new(forward_store, BincodeCodec)),
        Box::new(SerializingAdapter::new(reverse_store, BincodeCodec)),
    ))
}

/// A single module's assembled cache: proxied [`FieldMap`] inputs in,
/// proxied [`FieldMap`] results out. See the module docs for the chain this
/// wraps.
pub struct ModuleCache {
    maker: Arc<ProxyMapMaker>,
    chain: Box<dyn Database<FieldMap<'static>, FieldMap<'static>> + Send>,
    eager_checkpoint: bool,
}

impl ModuleCache {
    /// Assembles a fresh module cache scoped to `module_uuid`, sharing
    /// `mapper` with any other module caches that should agree on value
    /// UUIDs (spec.md §4.6 scenario S6).
    pub fn new(config: &CacheConfig, mapper: SharedUuidMapper, module_uuid: Uuid) -> Self {
        let maker = Arc::new(ProxyMapMaker::new(mapper));
        let base = build_chain(config, module_uuid);
        let keyed = KeyProxyMapper::new(maker.clone(), base);
        let chain: Box<dyn Database<FieldMap<'static>, FieldMap<'static>> + Send> =
            Box::new(ValueProxyMapper::new(maker.clone(), keyed));
        Self { maker, chain, eager_checkpoint: config.eager_checkpoint }
    }

    /// `true` iff a result is already memoized for `inputs`.
    pub fn contains(&self, inputs: &FieldMap<'static>) -> bool {
        self.chain.contains(inputs)
    }

    /// Memoizes `results` under `inputs`. When [`CacheConfig::eager_checkpoint`]
    /// is set, immediately checkpoints to the external backend rather than
    /// waiting for an explicit [`Self::checkpoint`]/[`Self::dump`] call.
    pub fn insert(&mut self, inputs: FieldMap<'static>, results: FieldMap<'static>) -> Result<()> {
        self.chain.insert(inputs, results)?;
        if self.eager_checkpoint {
            self.chain.checkpoint()?;
        }
        Ok(())
    }

    /// Removes any result memoized under `inputs`.
    pub fn remove(&mut self, inputs: &FieldMap<'static>) -> Result<()> {
        self.chain.remove(inputs)
    }

    /// Returns the result memoized under `inputs`, if any.
    pub fn get(&self, inputs: &FieldMap<'static>) -> Result<FieldMap<'static>> {
        Ok(self.chain.get(inputs)?.into_owned())
    }

    /// Pushes live state to the external backend, if configured, without
    /// clearing the in-memory layer.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.chain.checkpoint()
    }

    /// Checkpoints, then clears the in-memory layer.
    pub fn dump(&mut self) -> Result<()> {
        self.chain.dump()
    }

    /// The proxy maker backing this cache, shared with sibling caches that
    /// should agree on value UUIDs.
    pub fn proxy_maker(&self) -> &Arc<ProxyMapMaker> {
        &self.maker
    }
}

/// Single-threaded handles: one [`ModuleCache`] per module, owned
/// exclusively by the thread that runs it. Mirrors the non-`Send` local
/// cache handle the teacher crate exposes alongside its shared one.
pub mod local {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Owns every module's [`ModuleCache`] for a single thread, keyed by
    /// module uuid, all sharing one [`SharedUuidMapper`].
    #[derive(Clone)]
    pub struct LocalCacheSet {
        mapper: SharedUuidMapper,
        config: CacheConfig,
        caches: Rc<RefCell<HashMap<Uuid, ModuleCache>>>,
    }

    impl LocalCacheSet {
        pub fn new(config: CacheConfig) -> Self {
            let mapper = SharedUuidMapper::new_with_backup(build_uuid_backup(&config));
            Self { mapper, config, caches: Rc::new(RefCell::new(HashMap::new())) }
        }

        /// Returns the memoized result for `module_uuid`/`inputs`, building
        /// that module's cache on first use.
        pub fn get(&self, module_uuid: Uuid, inputs: &FieldMap<'static>) -> Result<FieldMap<'static>> {
            self.ensure(module_uuid);
            self.caches.borrow().get(&module_uuid).unwrap().get(inputs)
        }

        pub fn contains(&self, module_uuid: Uuid, inputs: &FieldMap<'static>) -> bool {
            self.ensure(module_uuid);
            self.caches.borrow().get(&module_uuid).unwrap().contains(inputs)
        }

        pub fn insert(
            &self,
            module_uuid: Uuid,
            inputs: FieldMap<'static>,
            results: FieldMap<'static>,
        ) -> Result<()> {
            self.ensure(module_uuid);
            self.caches.borrow_mut().get_mut(&module_uuid).unwrap().insert(inputs, results)
        }

        fn ensure(&self, module_uuid: Uuid) {
            let mut caches = self.caches.borrow_mut();
            caches
                .entry(module_uuid)
                .or_insert_with(|| ModuleCache::new(&self.config, self.mapper.clone(), module_uuid));
        }
    }
}

/// Thread-shared handles: every module cache lives behind a single `Mutex`,
/// reachable from any thread. Mirrors the teacher crate's `sync` cache
/// handle built on `parking_lot`.
pub mod sync {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Owns every module's [`ModuleCache`], keyed by module uuid, reachable
    /// from any thread.
    #[derive(Clone)]
    pub struct SharedCacheSet {
        mapper: SharedUuidMapper,
        config: CacheConfig,
        caches: Arc<Mutex<HashMap<Uuid, ModuleCache>>>,
    }

    impl SharedCacheSet {
        pub fn new(config: CacheConfig) -> Self {
            let mapper = SharedUuidMapper::new_with_backup(build_uuid_backup(&config));
            Self { mapper, config, caches: Arc::new(Mutex::new(HashMap::new())) }
        }

        pub fn get(&self, module_uuid: Uuid, inputs: &FieldMap<'static>) -> Result<FieldMap<'static>> {
            self.ensure(module_uuid);
            self.caches.lock().get(&module_uuid).unwrap().get(inputs)
        }

        pub fn contains(&self, module_uuid: Uuid, inputs: &FieldMap<'static>) -> bool {
            self.ensure(module_uuid);
            self.caches.lock().get(&module_uuid).unwrap().contains(inputs)
        }

        pub fn insert(
            &self,
            module_uuid: Uuid,
            inputs: FieldMap<'static>,
            results: FieldMap<'static>,
        ) -> Result<()> {
            self.ensure(module_uuid);
            self.caches.lock().get_mut(&module_uuid).unwrap().insert(inputs, results)
        }

        fn ensure(&self, module_uuid: Uuid) {
            let mut caches = self.caches.lock();
            caches
                .entry(module_uuid)
                .or_insert_with(|| ModuleCache::new(&self.config, self.mapper.clone(), module_uuid));
        }
    }
}
