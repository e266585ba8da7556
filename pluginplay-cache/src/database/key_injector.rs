//! Adds a fixed `(name, value)` pair to every incoming key before
//! delegating — used to scope a shared backend by module UUID so that two
//! modules with identical inputs never collide in the same store
//! (property 8, cache independence).
//!
//! Grounded on `original_source/src/pluginplay/cache/database/key_injector.hpp`.
//! Specialized to [`ProxyFieldMap`] keys, the only associative-map key type
//! this crate's chains ever use.

use super::{DbValue, Database};
use crate::error::Result;
use crate::uuid_proxy::ProxyFieldMap;
use uuid::Uuid;

pub struct KeyInjector<V, Inner> {
    field_name: String,
    value_to_inject: Uuid,
    inner: Inner,
    _value: std::marker::PhantomData<V>,
}

impl<V, Inner> KeyInjector<V, Inner>
where
    Inner: Database<ProxyFieldMap, V>,
{
    /// Wraps `inner`, injecting `(field_name, value_to_inject)` into every
    /// key before delegating.
    pub fn new(field_name: impl Into<String>, value_to_inject: Uuid, inner: Inner) -> Self {
        Self { field_name: field_name.into(), value_to_inject, inner, _value: std::marker::PhantomData }
    }

    fn inject(&self, mut key: ProxyFieldMap) -> ProxyFieldMap {
        key.insert(&self.field_name, self.value_to_inject);
        key
    }
}

impl<V, Inner> Database<ProxyFieldMap, V> for KeyInjector<V, Inner>
where
    Inner: Database<ProxyFieldMap, V>,
{
    fn contains(&self, key: &ProxyFieldMap) -> bool {
        self.inner.contains(&self.inject(key.clone()))
    }

    fn insert(&mut self, key: ProxyFieldMap, value: V) -> Result<()> {
        let key = self.inject(key);
        self.inner.insert(key, value)
    }

    fn remove(&mut self, key: &ProxyFieldMap) -> Result<()> {
        let key = self.inject(key.clone());
        self.inner.remove(&key)
    }

    fn get(&self, key: &ProxyFieldMap) -> Result<DbValue<'_, V>>
    where
        V: Clone,
    {
        let key = self.inject(key.clone());
        self.inner.get(&key)
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()
    }
}
