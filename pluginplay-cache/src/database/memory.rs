//! The in-memory store: a direct `HashMap`, optionally backed by another
//! adapter that `checkpoint`/`dump` push into.

use super::{DbValue, Database};
use crate::error::Result;
use hashbrown::HashMap;
use std::borrow::Cow;
use std::hash::Hash;

/// A direct key/value mapping held entirely in memory. May wrap an
/// optional `backup` adapter: `checkpoint` copies every entry into the
/// backup without clearing `self`; `dump` does the same and then clears.
pub struct InMemoryStore<K, V> {
    map: HashMap<K, V>,
    backup: Option<Box<dyn Database<K, V> + Send>>,
}

impl<K, V> InMemoryStore<K, V> {
    /// A store with no backup; `checkpoint`/`dump` are then no-ops beyond
    /// whatever `dump`'s clearing does.
    pub fn new() -> Self {
        Self { map: HashMap::new(), backup: None }
    }

    /// A store that checkpoints/dumps into `backup`.
    pub fn with_backup(backup: Box<dyn Database<K, V> + Send>) -> Self {
        Self { map: HashMap::new(), backup: Some(backup) }
    }

    /// Number of entries currently held in memory (excludes the backup).
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl<K, V> Default for InMemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Database<K, V> for InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.map.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &K) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn get(&self, key: &K) -> Result<DbValue<'_, V>> {
        let v = self.map.get(key).ok_or(crate::error::CacheError::Empty("in-memory store key"))?;
        Ok(Cow::Borrowed(v))
    }

    fn checkpoint(&mut self) -> Result<()> {
        if let Some(backup) = &mut self.backup {
            for (k, v) in self.map.iter() {
                backup.insert(k.clone(), v.clone())?;
            }
        }
        Ok(())
    }

    fn dump(&mut self) -> Result<()> {
        self.checkpoint()?;
        self.map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    /// Lets a test observe a backup store's contents after it's been moved
    /// into a `Box<dyn Database<..> + Send>`.
    struct Observed<K, V>(Rc<RefCell<InMemoryStore<K, V>>>);

    impl<K: Eq + Hash + Clone, V: Clone> Database<K, V> for Observed<K, V> {
        fn contains(&self, key: &K) -> bool {
            self.0.borrow().contains(key)
        }
        fn insert(&mut self, key: K, value: V) -> Result<()> {
            self.0.borrow_mut().insert(key, value)
        }
        fn remove(&mut self, key: &K) -> Result<()> {
            self.0.borrow_mut().remove(key)
        }
        fn get(&self, key: &K) -> Result<DbValue<'_, V>> {
            Ok(Cow::Owned(self.0.borrow().get(key)?.into_owned()))
        }
        fn checkpoint(&mut self) -> Result<()> {
            self.0.borrow_mut().checkpoint()
        }
        fn dump(&mut self) -> Result<()> {
            self.0.borrow_mut().dump()
        }
    }

    // Safety: these tests are single-threaded; `Rc`/`RefCell` never cross a
    // thread boundary here even though the trait object bound asks for `Send`.
    #[allow(unsafe_code)]
    unsafe impl<K, V> Send for Observed<K, V> {}

    #[test]
    fn checkpoint_populates_backup_without_clearing() {
        let backup = Rc::new(RefCell::new(InMemoryStore::<String, i32>::new()));
        let mut store = InMemoryStore::with_backup(Box::new(Observed(backup.clone())));
        store.insert("a".into(), 1).unwrap();
        store.checkpoint().unwrap();
        assert!(store.contains(&"a".to_string()));
        assert!(backup.borrow().contains(&"a".to_string()), "checkpoint must reach the backup");
    }

    #[test]
    fn dump_clears_in_memory_layer_and_fills_backup() {
        let backup = Rc::new(RefCell::new(InMemoryStore::<String, i32>::new()));
        let mut store = InMemoryStore::with_backup(Box::new(Observed(backup.clone())));
        store.insert("a".into(), 1).unwrap();
        store.dump().unwrap();
        assert!(!store.contains(&"a".to_string()));
        assert_eq!(store.len(), 0);
        assert!(backup.borrow().contains(&"a".to_string()), "dump must still reach the backup");
    }
}
