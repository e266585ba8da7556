//! Component E — the UUID proxy mapper.
//!
//! A [`UuidMapper`] owns a bijection between canonical field values and
//! opaque 128-bit identifiers (spec.md §3.7, §4.6). A [`ProxyMapMaker`]
//! uses one to turn a [`FieldMap`] into a [`ProxyFieldMap`] — a field map
//! whose values have all been replaced by their UUID — and remembers
//! enough to invert the transformation.
//!
//! Grounded on `original_source/src/pluginplay/cache/uuid_mapper.hpp` and
//! `proxy_map_maker.hpp`. The original stores values in an ordered
//! `std::map`, which is why spec.md §4.1 lists "ordering" among the
//! capabilities required of wrapped types. Field values here are
//! type-erased, so instead of requiring `Ord` on every possible payload
//! type we keep a flat, linearly-scanned table compared with
//! [`FieldCarrier::value_equal`] — see DESIGN.md for the tradeoff.
//!
//! `uuid_mapper.hpp`'s `DatabaseAPI`-based design persists the bijection
//! through the same `Database` abstraction the rest of the cache uses,
//! rather than keeping it purely in memory; [`UuidBackup`] mirrors that
//! here, wrapping two `Database`s (spec.md §6's second on-disk subtree: the
//! shared value-to-uuid database).

use crate::database::Database;
use crate::error::{CacheError, Result};
use crate::field::FieldCarrier;
use crate::field_map::FieldMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// A field map whose values have all been replaced by their UUID. Plain
/// `Uuid` values make this type trivially `Eq + Hash + Clone`, which is
/// what lets it serve as a key in [`crate::database::memory::InMemoryStore`].
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProxyFieldMap(BTreeMap<String, Uuid>);

impl ProxyFieldMap {
    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.0.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn insert(&mut self, name: &str, id: Uuid) {
        self.0.insert(name.to_ascii_lowercase(), id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Uuid)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Optional on-disk persistence for the value-to-uuid bijection (spec.md
/// §6's second subtree). Two directions are kept because reconstructing a
/// type-erased value from bytes requires knowing its concrete type, which
/// only the reverse store records; the forward direction alone is already
/// enough to keep [`UuidMapper::ensure`] returning the same uuid for the
/// same value across restarts.
pub struct UuidBackup {
    forward: Box<dyn Database<Vec<u8>, Uuid> + Send>,
    reverse: Box<dyn Database<Uuid, (String, Vec<u8>)> + Send>,
}

impl UuidBackup {
    pub fn new(
        forward: Box<dyn Database<Vec<u8>, Uuid> + Send>,
        reverse: Box<dyn Database<Uuid, (String, Vec<u8>)> + Send>,
    ) -> Self {
        Self { forward, reverse }
    }
}

/// Owns the bijection between canonical values and the UUIDs assigned to
/// them. Once assigned, a value's UUID is invariant for the mapper's
/// lifetime (spec.md §4.6's assignment policy).
#[derive(Default)]
pub struct UuidMapper {
    entries: Vec<(FieldCarrier<'static>, Uuid)>,
    backup: Option<UuidBackup>,
}

impl UuidMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapper that persists assignments through `backup`, so the same
    /// value is assigned the same uuid across process restarts.
    pub fn with_backup(backup: UuidBackup) -> Self {
        Self { entries: Vec::new(), backup: Some(backup) }
    }

    /// Returns the UUID already assigned to a value equal to `value`, if
    /// any. Only ever consults in-memory `entries`: the forward backup is
    /// keyed on encoded bytes, which [`Self::ensure`] already checks before
    /// assigning a fresh uuid, so every value that's passed through
    /// `ensure` at least once in this process is already present here.
    pub fn lookup_uuid(&self, value: &FieldCarrier<'_>) -> Option<Uuid> {
        self.entries.iter().find(|(v, _)| v.value_equal(value)).map(|(_, id)| *id)
    }

    /// Returns the value previously assigned `id`, if any: checked first
    /// in memory, then reconstructed from the persisted backup if a
    /// decoder has been registered for its concrete type (see
    /// [`FieldCarrier::decode_erased`]).
    pub fn lookup_value(&self, id: Uuid) -> Option<FieldCarrier<'static>> {
        if let Some((value, _)) = self.entries.iter().find(|(_, existing)| *existing == id) {
            return Some(value.clone());
        }
        let backup = self.backup.as_ref()?;
        let (type_tag, bytes) = backup.reverse.get(&id).ok()?.into_owned();
        FieldCarrier::decode_erased(&type_tag, &bytes)
    }

    /// `true` iff a value equal to `value` already has a UUID.
    pub fn contains(&self, value: &FieldCarrier<'_>) -> bool {
        self.lookup_uuid(value).is_some()
    }

    /// Returns the UUID for `value`, assigning a fresh one via the
    /// platform CSPRNG on first sight (or recovering a previously-assigned
    /// one from the backup, if `value` encodes to bytes already seen
    /// there).
    pub fn ensure(&mut self, value: &FieldCarrier<'_>) -> Uuid {
        if let Some(id) = self.lookup_uuid(value) {
            return id;
        }
        let encoded = value.try_encode();
        if let (Some(backup), Some(bytes)) = (&self.backup, &encoded) {
            if let Ok(existing) = backup.forward.get(bytes) {
                let id = *existing;
                self.entries.push((value.clone_owned(), id));
                return id;
            }
        }
        let id = Uuid::new_v4();
        tracing::trace!(tag = value.type_tag(), %id, "assigned fresh uuid");
        if let (Some(backup), Some(bytes)) = (&mut self.backup, encoded) {
            let type_tag = value.type_tag().to_string();
            if let Err(err) = backup.forward.insert(bytes.clone(), id) {
                tracing::warn!(%err, "failed to persist uuid forward assignment");
            }
            if let Err(err) = backup.reverse.insert(id, (type_tag, bytes)) {
                tracing::warn!(%err, "failed to persist uuid reverse assignment");
            }
        }
        self.entries.push((value.clone_owned(), id));
        id
    }

    /// Pushes any persisted assignments to the backup's own backing store,
    /// without clearing in-memory state.
    pub fn checkpoint(&mut self) -> Result<()> {
        if let Some(backup) = &mut self.backup {
            backup.forward.checkpoint()?;
            backup.reverse.checkpoint()?;
        }
        Ok(())
    }

    /// Checkpoints the backup, then clears its own in-memory layer. The
    /// mapper's `entries` are left untouched: a bijection already assigned
    /// this process stays valid even after a dump.
    pub fn dump(&mut self) -> Result<()> {
        if let Some(backup) = &mut self.backup {
            backup.forward.dump()?;
            backup.reverse.dump()?;
        }
        Ok(())
    }
}

/// Shared handle to a [`UuidMapper`], so multiple [`ProxyMapMaker`]s (e.g.
/// one per module, or one for inputs and one for results) agree on the
/// UUID assigned to a given value.
#[derive(Clone, Default)]
pub struct SharedUuidMapper(Arc<Mutex<UuidMapper>>);

impl SharedUuidMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared mapper backed by `backup` when `Some`, otherwise equivalent
    /// to [`Self::new`].
    pub fn new_with_backup(backup: Option<UuidBackup>) -> Self {
        Self(Arc::new(Mutex::new(match backup {
            Some(backup) => UuidMapper::with_backup(backup),
            None => UuidMapper::new(),
        })))
    }
}

/// Turns a [`FieldMap`] into a [`ProxyFieldMap`] and back, per spec.md
/// §4.6.
pub struct ProxyMapMaker {
    mapper: SharedUuidMapper,
}

impl ProxyMapMaker {
    pub fn new(mapper: SharedUuidMapper) -> Self {
        Self { mapper }
    }

    /// For each `(name, value)` in `map`, ensures the UUID mapper contains
    /// `value`, assigning a fresh uuid on first sight.
    pub fn install(&self, map: &FieldMap<'_>) {
        let mut guard = self.mapper.0.lock();
        for (_, value) in map.iter() {
            guard.ensure(value);
        }
    }

    /// Returns `{name -> uuid(value)}` for every field in `map`.
    pub fn proxy(&self, map: &FieldMap<'_>) -> ProxyFieldMap {
        let mut proxy = ProxyFieldMap::default();
        let mut guard = self.mapper.0.lock();
        for (name, value) in map.iter() {
            proxy.insert(name, guard.ensure(value));
        }
        proxy
    }

    /// Returns the original map a previous call to [`Self::proxy`]
    /// produced `proxy_map` from, by looking up each uuid in the shared
    /// [`UuidMapper`]. Fails with [`CacheError::UnknownProxy`] if any uuid
    /// in `proxy_map` isn't recognized (never assigned in this process, and
    /// not recoverable from the backup either — see
    /// [`UuidMapper::lookup_value`]).
    pub fn unproxy(&self, proxy_map: &ProxyFieldMap) -> Result<FieldMap<'static>> {
        let guard = self.mapper.0.lock();
        let mut out = FieldMap::new();
        for (name, id) in proxy_map.iter() {
            let value = guard
                .lookup_value(id)
                .ok_or_else(|| CacheError::UnknownProxy(format!("{:?}", proxy_map)))?;
            out.insert(name, value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_same_uuid_across_maps() {
        let mapper = SharedUuidMapper::new();
        let maker_a = ProxyMapMaker::new(mapper.clone());
        let maker_b = ProxyMapMaker::new(mapper);

        let mut map_a = FieldMap::new();
        map_a.insert("a", FieldCarrier::owned_const(1i32));
        map_a.insert("b", FieldCarrier::owned_const(2i32));

        let mut map_c = FieldMap::new();
        map_c.insert("c", FieldCarrier::owned_const(1i32));

        let proxy_a = maker_a.proxy(&map_a);
        let proxy_c = maker_b.proxy(&map_c);

        assert_eq!(proxy_a.get("a"), proxy_c.get("c"));
    }

    #[test]
    fn unproxy_recovers_the_original_map() {
        let maker = ProxyMapMaker::new(SharedUuidMapper::new());
        let mut map = FieldMap::new();
        map.insert("n", FieldCarrier::owned_const(42i32));

        let proxy = maker.proxy(&map);
        let recovered = maker.unproxy(&proxy).unwrap();
        assert_eq!(*recovered.get("n").unwrap().get::<i32>().unwrap(), 42);
    }

    #[test]
    fn unknown_proxy_uuid_fails() {
        let maker = ProxyMapMaker::new(SharedUuidMapper::new());
        let mut unrecognized = ProxyFieldMap::default();
        unrecognized.insert("n", Uuid::new_v4());
        assert!(maker.unproxy(&unrecognized).is_err());
    }

    fn in_memory_backup() -> UuidBackup {
        use crate::database::memory::InMemoryStore;
        UuidBackup::new(Box::new(InMemoryStore::new()), Box::new(InMemoryStore::new()))
    }

    #[test]
    fn ensure_recovers_the_same_uuid_from_a_shared_backup_after_a_simulated_restart() {
        let backup = in_memory_backup();
        let mut first = UuidMapper::with_backup(backup);
        let value = FieldCarrier::owned_const(7i32);
        let id = first.ensure(&value);
        first.checkpoint().unwrap();

        // A fresh mapper sharing the same backend (as if the process
        // restarted) must assign the identical uuid to an equal value.
        let UuidMapper { backup: carried_backup, .. } = first;
        let mut second = UuidMapper::with_backup(carried_backup.unwrap());
        assert_eq!(second.ensure(&value), id);
    }

    #[test]
    fn unproxy_recovers_a_value_via_the_backup_after_a_simulated_restart() {
        let mut mapper = UuidMapper::with_backup(in_memory_backup());
        let mut map = FieldMap::new();
        map.insert("n", FieldCarrier::owned_const(9i32));

        let proxy = {
            let value = map.get("n").unwrap();
            let mut proxy = ProxyFieldMap::default();
            proxy.insert("n", mapper.ensure(value));
            proxy
        };
        mapper.checkpoint().unwrap();

        // A fresh mapper/maker pair sharing the same backup, with no
        // in-memory `entries` of its own, still recovers the value: the
        // forward assignment made `ensure` above register a decoder for
        // `i32`, which `lookup_value` now uses against the reverse store.
        let UuidMapper { backup, .. } = mapper;
        let restarted = SharedUuidMapper::new_with_backup(backup);
        let restarted_maker = ProxyMapMaker::new(restarted);

        let recovered = restarted_maker.unproxy(&proxy).unwrap();
        assert_eq!(*recovered.get("n").unwrap().get::<i32>().unwrap(), 9);
    }
}
