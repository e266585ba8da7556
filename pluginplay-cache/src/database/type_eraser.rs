//! Wraps a `FieldCarrier -> V` adapter to present a `K -> V` interface for
//! an arbitrary user type `K`, converting each incoming `K` to a field
//! carrier via [`Wrap`] before delegating.

use super::{DbValue, Database};
use crate::error::Result;
use crate::field::FieldCarrier;
use std::borrow::Cow;

/// Customization point for how a concrete type becomes a [`FieldCarrier`]
/// when passing through a [`TypeEraser`]. A blanket impl covers every
/// `Clone + PartialEq + Send + Sync + 'static` type by wrapping it as an
/// owned, read-only carrier; override it if a type needs different
/// storage mode semantics.
pub trait Wrap {
    fn wrap(&self) -> FieldCarrier<'static>;
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Wrap for T {
    fn wrap(&self) -> FieldCarrier<'static> {
        FieldCarrier::owned_const(self.clone())
    }
}

pub struct TypeEraser<K, V, Inner> {
    inner: Inner,
    _types: std::marker::PhantomData<fn() -> (K, V)>,
}

impl<K, V, Inner> TypeEraser<K, V, Inner>
where
    Inner: Database<FieldCarrier<'static>, V>,
{
    pub fn new(inner: Inner) -> Self {
        Self { inner, _types: std::marker::PhantomData }
    }
}

impl<K, V, Inner> Database<K, V> for TypeEraser<K, V, Inner>
where
    K: Wrap,
    Inner: Database<FieldCarrier<'static>, V>,
{
    fn contains(&self, key: &K) -> bool {
        self.inner.contains(&key.wrap())
    }

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.inner.insert(key.wrap(), value)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        self.inner.remove(&key.wrap())
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, V>>
    where
        V: Clone,
    {
        // `key.wrap()` is a local temporary, so we can't return a borrow
        // tied to it; always hand the caller an owned value.
        Ok(Cow::Owned(self.inner.get(&key.wrap())?.into_owned()))
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()
    }
}
