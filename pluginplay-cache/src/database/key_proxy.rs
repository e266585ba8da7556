//! Wraps a `ProxyFieldMap -> V` adapter plus a [`ProxyMapMaker`] to present
//! a `FieldMap -> V` interface: on insert, the key is first run through the
//! proxy maker (assigning UUIDs), then the resulting proxy key is used to
//! address the wrapped database.

use super::{DbValue, Database};
use crate::error::Result;
use crate::field_map::FieldMap;
use crate::uuid_proxy::{ProxyFieldMap, ProxyMapMaker};
use std::borrow::Cow;
use std::sync::Arc;

pub struct KeyProxyMapper<V, Inner> {
    maker: Arc<ProxyMapMaker>,
    inner: Inner,
    _value: std::marker::PhantomData<V>,
}

impl<V, Inner> KeyProxyMapper<V, Inner>
where
    Inner: Database<ProxyFieldMap, V>,
{
    pub fn new(maker: Arc<ProxyMapMaker>, inner: Inner) -> Self {
        Self { maker, inner, _value: std::marker::PhantomData }
    }
}

impl<V, Inner> Database<FieldMap<'static>, V> for KeyProxyMapper<V, Inner>
where
    Inner: Database<ProxyFieldMap, V>,
{
    fn contains(&self, key: &FieldMap<'static>) -> bool {
        self.maker.install(key);
        self.inner.contains(&self.maker.proxy(key))
    }

    fn insert(&mut self, key: FieldMap<'static>, value: V) -> Result<()> {
        let proxy = self.maker.proxy(&key);
        self.inner.insert(proxy, value)
    }

    fn remove(&mut self, key: &FieldMap<'static>) -> Result<()> {
        let proxy = self.maker.proxy(key);
        self.inner.remove(&proxy)
    }

    fn get(&self, key: &FieldMap<'static>) -> Result<DbValue<'_, V>>
    where
        V: Clone,
    {
        let proxy = self.maker.proxy(key);
        Ok(Cow::Owned(self.inner.get(&proxy)?.into_owned()))
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryStore;
    use crate::field::FieldCarrier;
    use crate::uuid_proxy::SharedUuidMapper;

    fn inputs(n: i32) -> FieldMap<'static> {
        let mut m = FieldMap::new();
        m.insert("n", FieldCarrier::owned_const(n));
        m
    }

    fn mapper() -> KeyProxyMapper<i32, InMemoryStore<ProxyFieldMap, i32>> {
        let maker = Arc::new(ProxyMapMaker::new(SharedUuidMapper::new()));
        KeyProxyMapper::new(maker, InMemoryStore::new())
    }

    #[test]
    fn insert_and_get_round_trip_through_the_proxy_key() {
        let mut m = mapper();
        m.insert(inputs(1), 42).unwrap();
        assert!(m.contains(&inputs(1)));
        assert_eq!(*m.get(&inputs(1)).unwrap(), 42);
    }

    #[test]
    fn distinct_field_maps_proxy_to_distinct_keys() {
        let mut m = mapper();
        m.insert(inputs(1), 1).unwrap();
        assert!(!m.contains(&inputs(2)));
    }

    #[test]
    fn remove_clears_the_proxied_key() {
        let mut m = mapper();
        m.insert(inputs(1), 42).unwrap();
        m.remove(&inputs(1)).unwrap();
        assert!(!m.contains(&inputs(1)));
    }
}
