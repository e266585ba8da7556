//! Dual of [`super::key_proxy::KeyProxyMapper`]: wraps a `K -> ProxyFieldMap`
//! adapter to present a `K -> FieldMap` interface, proxying the *value*
//! instead of the key.

use super::{DbValue, Database};
use crate::error::Result;
use crate::field_map::FieldMap;
use crate::uuid_proxy::{ProxyFieldMap, ProxyMapMaker};
use std::borrow::Cow;
use std::sync::Arc;

pub struct ValueProxyMapper<K, Inner> {
    maker: Arc<ProxyMapMaker>,
    inner: Inner,
    _key: std::marker::PhantomData<K>,
}

impl<K, Inner> ValueProxyMapper<K, Inner>
where
    Inner: Database<K, ProxyFieldMap>,
{
    pub fn new(maker: Arc<ProxyMapMaker>, inner: Inner) -> Self {
        Self { maker, inner, _key: std::marker::PhantomData }
    }
}

impl<K, Inner> Database<K, FieldMap<'static>> for ValueProxyMapper<K, Inner>
where
    Inner: Database<K, ProxyFieldMap>,
{
    fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    fn insert(&mut self, key: K, value: FieldMap<'static>) -> Result<()> {
        let proxy = self.maker.proxy(&value);
        self.inner.insert(key, proxy)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        self.inner.remove(key)
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, FieldMap<'static>>> {
        let proxy = self.inner.get(key)?;
        Ok(Cow::Owned(self.maker.unproxy(&proxy)?))
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()
    }
}
