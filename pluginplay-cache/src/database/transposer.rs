//! Presents a `V -> K` adapter as a `K -> V` one.
//!
//! Used when one side of a mapping is much larger than the other and the
//! backend is key-optimized: store the large side as the backend's real
//! key and the small side as its value, then flip the interface back
//! around here. Grounded on
//! `original_source/src/pluginplay/database/detail_/transposer.hpp`.

use super::{DbValue, Database};
use crate::error::{CacheError, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::hash::Hash;

/// Wraps a `Database<V, K>` to expose a `Database<K, V>` interface.
///
/// Tracks the set of `V`s it has handed to the wrapped database (these are
/// the wrapped database's *real* keys), because the wrapped map can't
/// enumerate by `K` efficiently; every lookup loops over that set.
pub struct Transposer<K, V, Inner> {
    known_values: HashSet<V>,
    inner: Inner,
    _key: std::marker::PhantomData<K>,
}

impl<K, V, Inner> Transposer<K, V, Inner>
where
    Inner: Database<V, K>,
{
    pub fn new(inner: Inner) -> Self {
        Self { known_values: HashSet::new(), inner, _key: std::marker::PhantomData }
    }
}

impl<K, V, Inner> Database<K, V> for Transposer<K, V, Inner>
where
    K: Eq + Clone,
    V: Eq + Hash + Clone,
    Inner: Database<V, K>,
{
    fn contains(&self, key: &K) -> bool {
        self.known_values.iter().any(|v| matches!(self.inner.get(v), Ok(k) if &*k == key))
    }

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.known_values.insert(value.clone());
        self.inner.insert(value, key)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        let found = self
            .known_values
            .iter()
            .find(|v| matches!(self.inner.get(v), Ok(k) if &*k == key))
            .cloned();
        if let Some(value) = found {
            self.known_values.remove(&value);
            self.inner.remove(&value)?;
        }
        Ok(())
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, V>> {
        self.known_values
            .iter()
            .find(|v| matches!(self.inner.get(v), Ok(k) if &*k == key))
            .cloned()
            .map(Cow::Owned)
            .ok_or(CacheError::Empty("transposer key"))
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()?;
        self.known_values.clear();
        Ok(())
    }
}
