//! Wraps a binary-key, binary-value adapter, serializing keys/values with a
//! user-supplied [`Codec`] on the way in and deserializing values on the
//! way out.

use super::{DbValue, Database};
use crate::codec::Codec;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::marker::PhantomData;

pub struct SerializingAdapter<K, V, Inner, C> {
    inner: Inner,
    codec: C,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V, Inner, C> SerializingAdapter<K, V, Inner, C>
where
    Inner: Database<Vec<u8>, Vec<u8>>,
    C: Codec,
{
    pub fn new(inner: Inner, codec: C) -> Self {
        Self { inner, codec, _types: PhantomData }
    }
}

impl<K, V, Inner, C> Database<K, V> for SerializingAdapter<K, V, Inner, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned + Clone,
    Inner: Database<Vec<u8>, Vec<u8>>,
    C: Codec,
{
    fn contains(&self, key: &K) -> bool {
        match self.codec.encode(key) {
            Ok(bytes) => self.inner.contains(&bytes),
            Err(_) => false,
        }
    }

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        let key = self.codec.encode(&key)?;
        let value = self.codec.encode(&value)?;
        self.inner.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        let key = self.codec.encode(key)?;
        self.inner.remove(&key)
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, V>> {
        let key = self.codec.encode(key)?;
        let bytes = self.inner.get(&key)?;
        let value: V = self.codec.decode(&bytes)?;
        Ok(Cow::Owned(value))
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.inner.checkpoint()
    }

    fn dump(&mut self) -> Result<()> {
        self.inner.dump()
    }
}

/// Grounded on `original_source/tests/.../serialized.cpp`, whose
/// `TEMPLATE_LIST_TEST_CASE` sweeps literal/class key-value mixes
/// (`int`/`int`, `int`/`string`, `string`/`int`, `string`/`string`) against
/// the same insert/count/free/dump operations. A generic helper plays the
/// same role here without needing a macro: each test below picks one
/// key/value type pair.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryStore;
    use crate::codec::BincodeCodec;

    fn adapter<K, V>() -> SerializingAdapter<K, V, InMemoryStore<Vec<u8>, Vec<u8>>, BincodeCodec>
    where
        K: Serialize + DeserializeOwned,
        V: Serialize + DeserializeOwned + Clone,
    {
        SerializingAdapter::new(InMemoryStore::new(), BincodeCodec)
    }

    #[test]
    fn int_to_int_round_trips() {
        let mut db = adapter::<i32, i32>();
        db.insert(1, 42).unwrap();
        assert!(db.contains(&1));
        assert!(!db.contains(&0));
        assert_eq!(*db.get(&1).unwrap(), 42);
    }

    #[test]
    fn int_to_string_round_trips() {
        let mut db = adapter::<i32, String>();
        db.insert(1, "42".to_string()).unwrap();
        assert_eq!(*db.get(&1).unwrap(), "42");
    }

    #[test]
    fn string_to_int_round_trips() {
        let mut db = adapter::<String, i32>();
        db.insert("1".to_string(), 42).unwrap();
        assert_eq!(*db.get(&"1".to_string()).unwrap(), 42);
    }

    #[test]
    fn insert_overwrites_an_existing_key() {
        let mut db = adapter::<String, String>();
        db.insert("k".to_string(), "first".to_string()).unwrap();
        db.insert("k".to_string(), "second".to_string()).unwrap();
        assert_eq!(*db.get(&"k".to_string()).unwrap(), "second");
    }

    #[test]
    fn remove_is_idempotent() {
        let mut db = adapter::<String, i32>();
        db.remove(&"k".to_string()).unwrap();
        assert!(!db.contains(&"k".to_string()));
        db.insert("k".to_string(), 1).unwrap();
        db.remove(&"k".to_string()).unwrap();
        db.remove(&"k".to_string()).unwrap();
        assert!(!db.contains(&"k".to_string()));
    }

    #[test]
    fn dump_clears_every_entry() {
        let mut db = adapter::<String, i32>();
        db.insert("k".to_string(), 1).unwrap();
        db.dump().unwrap();
        assert!(!db.contains(&"k".to_string()));
    }
}
