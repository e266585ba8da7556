//! Component H — a free-form typed key/value store exposed to module
//! implementations, outside the run-memoization pipeline (spec.md §4.8).
//! Entries here are not fingerprinted; the module author is responsible
//! for soundness.
//!
//! Grounded on the teacher crate's type-sharded `Namespace` design
//! (`pluginplay-cache`'s vendored-then-trimmed `storage.rs`/`definition.rs`):
//! one shard per distinct `(K, V)` type pair, looked up by `TypeId` so a
//! single cache can hold arbitrarily many unrelated key/value type pairs
//! without a user pre-declaring a schema. Unlike the teacher's query cache,
//! entries here have no liveness tracking — spec.md §4.8 describes a plain
//! store, not a GC'd one, so that machinery isn't carried over.

use hash_hasher::HashBuildHasher;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;

/// A `TypeId`-sharded key/value store: `insert`/`get`/`remove` for a given
/// `(K, V)` pair only ever touch that pair's own shard, so unrelated types
/// never collide.
///
/// Shards are keyed by `TypeId` under a [`HashBuildHasher`], the same
/// pass-through hasher the teacher crate's own `TypeId`-keyed query store
/// uses — `TypeId`s are globally unique and already hashed by rustc, so
/// re-hashing them through a general-purpose hasher is pure overhead.
#[derive(Default)]
pub struct UserCache {
    shards: HashMap<TypeId, Box<dyn Any + Send + Sync>, HashBuildHasher>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` in the `(K, V)` shard, creating it if
    /// this is the first entry of that type pair.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let shard = self
            .shards
            .entry(TypeId::of::<(K, V)>())
            .or_insert_with(|| Box::new(HashMap::<K, V>::new()));
        let shard: &mut HashMap<K, V> = shard.downcast_mut().expect("shard type matches its TypeId key");
        shard.insert(key, value);
    }

    /// Returns the value stored under `key` in the `(K, V)` shard, if any.
    pub fn get<K, V>(&self, key: &K) -> Option<&V>
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let shard = self.shards.get(&TypeId::of::<(K, V)>())?;
        let shard: &HashMap<K, V> = shard.downcast_ref().expect("shard type matches its TypeId key");
        shard.get(key)
    }

    /// Removes and returns the value stored under `key` in the `(K, V)`
    /// shard, if any.
    pub fn remove<K, V>(&mut self, key: &K) -> Option<V>
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let shard = self.shards.get_mut(&TypeId::of::<(K, V)>())?;
        let shard: &mut HashMap<K, V> = shard.downcast_mut().expect("shard type matches its TypeId key");
        shard.remove(key)
    }

    /// `true` iff a value is stored under `key` in the `(K, V)` shard.
    pub fn contains<K, V>(&self, key: &K) -> bool
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        self.get::<K, V>(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_type_pairs_do_not_collide() {
        let mut cache = UserCache::new();
        cache.insert::<String, i32>("n".to_string(), 1);
        cache.insert::<String, &'static str>("n".to_string(), "one");

        assert_eq!(cache.get::<String, i32>(&"n".to_string()), Some(&1));
        assert_eq!(cache.get::<String, &'static str>(&"n".to_string()), Some(&"one"));
    }

    #[test]
    fn remove_clears_only_that_entry() {
        let mut cache = UserCache::new();
        cache.insert(1u32, "a".to_string());
        cache.insert(2u32, "b".to_string());

        assert_eq!(cache.remove::<u32, String>(&1), Some("a".to_string()));
        assert!(!cache.contains::<u32, String>(&1));
        assert!(cache.contains::<u32, String>(&2));
    }
}
