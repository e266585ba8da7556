//! Component D — the database adapter chain.
//!
//! Every adapter in this module implements [`Database`], the single
//! uniform key/value interface spec.md §3.6 describes. Adapters compose by
//! wrapping: each one transforms keys, values, or both before delegating to
//! the adapter it wraps, down to a terminal in-memory or external store.

pub mod external;
pub mod key_injector;
pub mod key_proxy;
pub mod memory;
pub mod serializing;
pub mod transposer;
pub mod type_eraser;
pub mod value_proxy;

use crate::error::Result;
use std::borrow::Cow;

/// A value returned from [`Database::get`]: either owned by the caller or
/// borrowed from the backend. Callers never mutate what they get back.
pub type DbValue<'a, V> = Cow<'a, V>;

/// The uniform key/value interface every layer of the adapter chain
/// satisfies (spec.md §3.6, §4.5).
///
/// `checkpoint` pushes live state to a wrapped backing store without
/// losing in-memory access; `dump` checkpoints and then clears the
/// in-memory layer. Implementations surface a wrapped adapter's errors
/// unchanged; a layer only originates its own error (`InvalidWrap`) at
/// construction time.
pub trait Database<K, V> {
    fn contains(&self, key: &K) -> bool;
    fn insert(&mut self, key: K, value: V) -> Result<()>;
    fn remove(&mut self, key: &K) -> Result<()>;
    fn get(&self, key: &K) -> Result<DbValue<'_, V>>
    where
        V: Clone;
    fn checkpoint(&mut self) -> Result<()>;
    fn dump(&mut self) -> Result<()>;
}

/// Lets a boxed adapter chain satisfy `Database` itself, so composing
/// layers can hold a trait object (`Box<dyn Database<K, V> + Send>`)
/// wherever a concrete `Inner: Database<K, V>` is otherwise expected.
impl<K, V> Database<K, V> for Box<dyn Database<K, V> + Send> {
    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        (**self).insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        (**self).remove(key)
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, V>>
    where
        V: Clone,
    {
        (**self).get(key)
    }

    fn checkpoint(&mut self) -> Result<()> {
        (**self).checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        (**self).dump()
    }
}
