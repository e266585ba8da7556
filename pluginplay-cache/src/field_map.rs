//! Component B — an ordered, name-keyed collection of field carriers.

use crate::error::{CacheError, Result};
use crate::field::FieldCarrier;
use std::collections::BTreeMap;
use std::fmt;

/// Case-insensitive, name-keyed collection of [`FieldCarrier`]s.
///
/// Backed by a `BTreeMap` on the lowered key so iteration order is always
/// lexicographic-by-lowered-key, which is what the fingerprint encoder in
/// `pluginplay::fingerprint` relies on to produce a canonical byte stream.
#[derive(Clone, Default)]
pub struct FieldMap<'a> {
    fields: BTreeMap<String, FieldCarrier<'a>>,
}

impl<'a> FieldMap<'a> {
    /// An empty map.
    pub fn new() -> Self {
        Self { fields: BTreeMap::new() }
    }

    /// Inserts `carrier` under `name`, overwriting any existing value.
    /// Keys are matched case-insensitively.
    pub fn insert(&mut self, name: &str, carrier: FieldCarrier<'a>) {
        self.fields.insert(name.to_ascii_lowercase(), carrier);
    }

    /// Returns the carrier stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&FieldCarrier<'a>> {
        self.fields.get(&name.to_ascii_lowercase())
    }

    /// Returns a mutable reference to the carrier stored under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldCarrier<'a>> {
        self.fields.get_mut(&name.to_ascii_lowercase())
    }

    /// Removes and returns the carrier stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<FieldCarrier<'a>> {
        self.fields.remove(&name.to_ascii_lowercase())
    }

    /// `true` iff a (possibly empty) carrier is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_lowercase())
    }

    /// `true` iff the map has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields in the map.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates fields in lowered-key order: `(lowered_name, carrier)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldCarrier<'a>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a required field, converting a missing entry into
    /// [`CacheError::Empty`] rather than an `Option`.
    pub fn require(&self, name: &str) -> Result<&FieldCarrier<'a>> {
        self.get(name).ok_or(CacheError::Empty("required field"))
    }

    /// Deep-copies every field into a map with no borrowed data, suitable
    /// for long-lived storage (e.g. inside a cache entry).
    pub fn to_owned_map(&self) -> FieldMap<'static> {
        let mut owned = FieldMap::new();
        for (k, v) in self.fields.iter() {
            owned.fields.insert(k.clone(), v.clone_owned());
        }
        owned
    }

    /// Merges `overrides` into a copy of `self`; fields present in both
    /// take `overrides`'s value ("override wins"), per the run algorithm's
    /// `effective = merge(bound_inputs, input_overrides)` step.
    pub fn merged_with(&self, overrides: &FieldMap<'a>) -> FieldMap<'a> {
        let mut merged = FieldMap::new();
        for (k, v) in self.fields.iter() {
            merged.fields.insert(k.clone(), v.clone_owned());
        }
        for (k, v) in overrides.fields.iter() {
            merged.fields.insert(k.clone(), v.clone_owned());
        }
        merged
    }
}

impl fmt::Debug for FieldMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter().map(|(k, v)| (k, v.type_tag()))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldCarrier;

    #[test]
    fn keys_are_case_insensitive() {
        let mut m = FieldMap::new();
        m.insert("N", FieldCarrier::owned_const(1i32));
        assert!(m.contains("n"));
        assert_eq!(*m.get("n").unwrap().get::<i32>().unwrap(), 1);
    }

    #[test]
    fn iteration_is_lowered_key_order() {
        let mut m = FieldMap::new();
        m.insert("zeta", FieldCarrier::owned_const(1i32));
        m.insert("Alpha", FieldCarrier::owned_const(2i32));
        m.insert("mid", FieldCarrier::owned_const(3i32));
        let names: Vec<_> = m.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn merge_prefers_overrides() {
        let mut base = FieldMap::new();
        base.insert("n", FieldCarrier::owned_const(1i32));
        base.insert("keep", FieldCarrier::owned_const(9i32));

        let mut over = FieldMap::new();
        over.insert("n", FieldCarrier::owned_const(2i32));

        let merged = base.merged_with(&over);
        assert_eq!(*merged.get("n").unwrap().get::<i32>().unwrap(), 2);
        assert_eq!(*merged.get("keep").unwrap().get::<i32>().unwrap(), 9);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        // Iteration order depends only on the set of names inserted, never
        // on the order they were inserted in — what the fingerprint encoder
        // (`pluginplay::fingerprint::build`) relies on for a canonical byte
        // stream (spec.md §5.3).
        #[test]
        fn iteration_order_is_insertion_order_independent() {
            let mut names: Vec<String> =
                vec!["beta".into(), "Alpha".into(), "gamma".into(), "delta".into()];

            let mut forward = FieldMap::new();
            for (i, n) in names.iter().enumerate() {
                forward.insert(n, FieldCarrier::owned_const(i as i32));
            }
            let forward_order: Vec<_> = forward.iter().map(|(k, _)| k.to_string()).collect();

            names.reverse();
            let mut reversed = FieldMap::new();
            for (i, n) in names.iter().enumerate() {
                reversed.insert(n, FieldCarrier::owned_const(i as i32));
            }
            let reversed_order: Vec<_> = reversed.iter().map(|(k, _)| k.to_string()).collect();

            assert_eq!(forward_order, reversed_order);
        }

        proptest! {
            #[test]
            fn iteration_is_always_sorted_lowercase(values: Vec<(String, i32)>) {
                let mut m = FieldMap::new();
                for (name, v) in &values {
                    if !name.is_empty() {
                        m.insert(name, FieldCarrier::owned_const(*v));
                    }
                }
                let names: Vec<_> = m.iter().map(|(k, _)| k.to_string()).collect();
                let mut sorted = names.clone();
                sorted.sort();
                prop_assert_eq!(names, sorted);
            }
        }
    }
}
