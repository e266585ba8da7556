//! §5.3 — the call fingerprint: a canonical field map folding together the
//! effective inputs, each bound submodule's identity, and the
//! implementation's own identity, suitable as the key [`crate::shell`]
//! hands to a [`pluginplay_cache::ModuleCache`].
//!
//! The spec describes the fingerprint as a canonical *byte* encoding of
//! `(id, proxy(I), submodule_list)`. This crate realizes that encoding one
//! layer up: rather than hand-rolling byte concatenation here, the
//! submodule and implementation identities are folded into an ordinary
//! [`FieldMap`] alongside the effective inputs, and the existing proxy
//! chain (`pluginplay-cache`'s `KeyProxyMapper`/`SerializingAdapter`)
//! produces the canonical bytes when a binary backend is in play. Both
//! `FieldMap` (lexicographic by lowered key) and `ProxyFieldMap` (a
//! `BTreeMap`) already iterate deterministically, so this still satisfies
//! §5.3's ordering requirement without a second encoder.

use std::collections::BTreeMap;

use pluginplay_cache::{FieldCarrier, FieldMap};
use uuid::Uuid;

use crate::error::{PlayError, Result};
use crate::submodule::SubmoduleRequest;

const IMPLEMENTATION_FIELD: &str = "__implementation_id__";
const SUBMODULE_PREFIX: &str = "__submodule__";

/// Builds the field map a [`pluginplay_cache::ModuleCache`] is probed and
/// populated with for one `run` call: `effective` plus one synthetic field
/// per bound submodule (`__submodule__<name>` → bound uuid) plus one
/// synthetic field for the implementation's own identity.
///
/// Fails with [`PlayError::NotReady`]-adjacent [`PlayError::Empty`] if any
/// submodule required for memoization has no assigned uuid — this should
/// never happen once `lock()` has succeeded, since locking a submodule
/// requires its bound module to be ready, and a ready module that's meant
/// to be memoized always has a uuid.
pub fn build(
    effective: &FieldMap<'static>,
    submodules: &BTreeMap<String, SubmoduleRequest>,
    implementation_id: Uuid,
) -> Result<FieldMap<'static>> {
    let mut key = effective.clone();
    key.insert(IMPLEMENTATION_FIELD, FieldCarrier::owned_const(implementation_id));
    for (name, request) in submodules.iter() {
        let sub_uuid = request
            .bound_uuid()
            .ok_or_else(|| PlayError::Empty("submodule uuid for fingerprint"))?;
        key.insert(&format!("{SUBMODULE_PREFIX}{name}"), FieldCarrier::owned_const(sub_uuid));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps_agree(a: &FieldMap<'static>, b: &FieldMap<'static>) -> bool {
        let a_names: Vec<_> = a.iter().map(|(k, _)| k.to_string()).collect();
        let b_names: Vec<_> = b.iter().map(|(k, _)| k.to_string()).collect();
        a_names == b_names
            && a.iter().all(|(k, v)| b.get(k).map_or(false, |bv| v.value_equal(bv)))
    }

    #[test]
    fn no_submodules_just_tags_the_implementation_id() {
        let mut effective = FieldMap::new();
        effective.insert("n", FieldCarrier::owned_const(1i32));

        let id = Uuid::new_v4();
        let key = build(&effective, &BTreeMap::new(), id).unwrap();

        assert_eq!(*key.get("n").unwrap().get::<i32>().unwrap(), 1);
        assert_eq!(*key.get(IMPLEMENTATION_FIELD).unwrap().get::<Uuid>().unwrap(), id);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // §5.3: the fingerprint is a canonical encoding of the effective
            // input map — it must not depend on the order fields were
            // inserted into that map, only on the (name, value) set.
            #[test]
            fn fingerprint_is_independent_of_insertion_order(
                mut names_values: Vec<(String, i32)>,
                raw_id: u128,
            ) {
                names_values.retain(|(n, _)| !n.is_empty());
                // de-duplicate names; FieldMap::insert overwrites on repeat.
                let mut seen = std::collections::HashSet::new();
                names_values.retain(|(n, _)| seen.insert(n.to_ascii_lowercase()));

                let mut forward = FieldMap::new();
                for (n, v) in &names_values {
                    forward.insert(n, FieldCarrier::owned_const(*v));
                }

                let mut rev_pairs = names_values.clone();
                rev_pairs.reverse();
                let mut backward = FieldMap::new();
                for (n, v) in &rev_pairs {
                    backward.insert(n, FieldCarrier::owned_const(*v));
                }

                let id = Uuid::from_u128(raw_id);
                let key_a = build(&forward, &BTreeMap::new(), id).unwrap();
                let key_b = build(&backward, &BTreeMap::new(), id).unwrap();

                prop_assert!(maps_agree(&key_a, &key_b));
            }
        }
    }
}
