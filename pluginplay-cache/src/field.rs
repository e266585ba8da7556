//! Component A — the type-erased field carrier.
//!
//! A [`FieldCarrier`] holds exactly one value of an arbitrary `'static`
//! type, remembering how it came to be stored (owned mutable, owned
//! read-only, or a read-only borrow of externally-owned storage) so that
//! retrieval can enforce the same aliasing rules the original value's owner
//! would expect.

use crate::error::{CacheError, Result};
use downcast_rs::{impl_downcast, Downcast};
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt;
use std::sync::OnceLock;

/// How a [`FieldCarrier`]'s payload is owned.
///
/// Fixed at construction; a carrier never changes mode in place (cloning
/// a `BorrowedConst` carrier yields a new, owning carrier instead).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StorageMode {
    /// The carrier owns its value and permits mutable access to it.
    OwnedMutable,
    /// The carrier owns its value but only permits read-only access.
    OwnedConst,
    /// The carrier aliases a value owned elsewhere; the caller guarantees
    /// the referent outlives the carrier.
    BorrowedConst,
}

/// Object-safe requirements a value must satisfy to live inside a
/// [`FieldCarrier`]: clonability, equality, a `'static` type tag, and
/// `Send + Sync` so a carrier can cross into a shared, lock-guarded cache
/// (spec.md §5's thread-safe-backend scenario).
///
/// Implemented automatically for any `T: Clone + PartialEq + Send + Sync +
/// 'static`; a crate need never implement this by hand.
pub trait FieldValue: Downcast + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn FieldValue>;
    fn dyn_eq(&self, other: &dyn FieldValue) -> bool;
    fn type_name(&self) -> &'static str;
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn try_encode(&self) -> Option<Vec<u8>>;
}

impl_downcast!(FieldValue);

impl<T> FieldValue for T
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone_boxed(&self) -> Box<dyn FieldValue> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn FieldValue) -> bool {
        other.downcast_ref::<T>().map_or(false, |o| self == o)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_value(self, f)
    }

    fn try_encode(&self) -> Option<Vec<u8>> {
        encode_value(self)
    }
}

impl fmt::Debug for dyn FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_value(f)
    }
}

// Printability is optional on wrapped types: when `T: fmt::Display` we defer
// to it, otherwise we fall back to a `<type_tag @ address>` proxy. Stable
// Rust has no specialization, so this leans on the "autoref" trick: method
// lookup prefers the impl on `&Wrap<T>` (more derefs = lower priority) over
// the one on `&&Wrap<T>`, and only the `Display` impl exists on the former.
struct Wrap<'a, T>(&'a T);

trait PrintViaDisplay {
    fn print_field(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<'a, T: fmt::Display> PrintViaDisplay for &Wrap<'a, T> {
    fn print_field(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

trait PrintViaFallback {
    fn print_field(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<'a, T> PrintViaFallback for &&Wrap<'a, T> {
    fn print_field(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} @ {:#x}>", type_name::<T>(), self.0 .0 as *const T as usize)
    }
}

fn print_value<T: 'static>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    (&&Wrap(value)).print_field(f)
}

/// Reconstructs a concrete `T` from bytes, given the type's own
/// `type_tag`. Registered lazily (see [`register_decoder`]) the first time
/// a value of that type is actually encoded, so this registry never needs
/// an upfront list of every type a crate user might store in a field.
type DecodeFn = fn(&[u8]) -> Option<Box<dyn FieldValue>>;

static DECODERS: OnceLock<Mutex<hashbrown::HashMap<&'static str, DecodeFn>>> = OnceLock::new();

fn decoders() -> &'static Mutex<hashbrown::HashMap<&'static str, DecodeFn>> {
    DECODERS.get_or_init(|| Mutex::new(hashbrown::HashMap::new()))
}

fn register_decoder<T>()
where
    T: serde::de::DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
{
    decoders().lock().entry(type_name::<T>()).or_insert_with(|| {
        (|bytes: &[u8]| -> Option<Box<dyn FieldValue>> {
            bincode::deserialize::<T>(bytes).ok().map(|v| Box::new(v) as Box<dyn FieldValue>)
        }) as DecodeFn
    });
}

// Best-effort byte encoding, used by `uuid_proxy::UuidMapper` to persist
// value-to-uuid assignments: `Some` iff the stored type happens to be
// `Serialize + DeserializeOwned`. Same autoref trick as `print_value`
// above, reusing `Wrap` — encoding also registers a decoder for the
// concrete type, since recovering a value from bytes later needs to know
// how to deserialize it.
trait EncodeViaSerde {
    fn encode_field(&self) -> Option<Vec<u8>>;
}

impl<'a, T> EncodeViaSerde for &Wrap<'a, T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
{
    fn encode_field(&self) -> Option<Vec<u8>> {
        register_decoder::<T>();
        bincode::serialize(self.0).ok()
    }
}

trait EncodeViaFallback {
    fn encode_field(&self) -> Option<Vec<u8>>;
}

impl<'a, T> EncodeViaFallback for &&Wrap<'a, T> {
    fn encode_field(&self) -> Option<Vec<u8>> {
        None
    }
}

fn encode_value<T: 'static>(value: &T) -> Option<Vec<u8>> {
    (&&Wrap(value)).encode_field()
}

/// The sentinel type tag reported by an empty carrier.
pub const EMPTY_TYPE_TAG: &str = "<empty>";

enum Payload<'a> {
    Empty,
    Owned(Box<dyn FieldValue>),
    Borrowed(&'a dyn FieldValue),
}

/// A type-erased container for exactly one value, plus its ownership mode.
///
/// See the module docs for the invariants this type upholds.
pub struct FieldCarrier<'a> {
    mode: StorageMode,
    payload: Payload<'a>,
}

impl<'a> FieldCarrier<'a> {
    /// Constructs an empty carrier, holding no value.
    pub fn empty() -> Self {
        Self { mode: StorageMode::OwnedConst, payload: Payload::Empty }
    }

    /// Wraps `value` as an owned, mutably-accessible field.
    pub fn owned_mutable<T: Clone + PartialEq + Send + Sync + 'static>(value: T) -> Self {
        Self { mode: StorageMode::OwnedMutable, payload: Payload::Owned(Box::new(value)) }
    }

    /// Wraps `value` as an owned, read-only field.
    pub fn owned_const<T: Clone + PartialEq + Send + Sync + 'static>(value: T) -> Self {
        Self { mode: StorageMode::OwnedConst, payload: Payload::Owned(Box::new(value)) }
    }

    /// Wraps a borrow of `value`; the caller guarantees `value` outlives
    /// the returned carrier.
    pub fn borrowed<T: Clone + PartialEq + Send + Sync + 'static>(value: &'a T) -> Self {
        Self { mode: StorageMode::BorrowedConst, payload: Payload::Borrowed(value) }
    }

    /// True if this carrier holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }

    /// This carrier's storage mode.
    pub fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    /// The runtime type tag of the stored value, or [`EMPTY_TYPE_TAG`].
    pub fn type_tag(&self) -> &'static str {
        match &self.payload {
            Payload::Empty => EMPTY_TYPE_TAG,
            Payload::Owned(v) => v.type_name(),
            Payload::Borrowed(v) => v.type_name(),
        }
    }

    fn inner(&self) -> Option<&dyn FieldValue> {
        match &self.payload {
            Payload::Empty => None,
            Payload::Owned(v) => Some(v.as_ref()),
            Payload::Borrowed(v) => Some(*v),
        }
    }

    /// Best-effort canonical byte encoding of the stored value: `Some` iff
    /// the concrete type happens to be `Serialize + DeserializeOwned`,
    /// `None` for an empty carrier or an opaque type. Used by
    /// [`crate::uuid_proxy::UuidMapper`] to persist value-to-uuid
    /// assignments across restarts; succeeding also registers a decoder for
    /// the concrete type, so a later [`Self::decode_erased`] call for the
    /// same `type_tag` can reconstruct it.
    pub fn try_encode(&self) -> Option<Vec<u8>> {
        self.inner().and_then(|v| v.try_encode())
    }

    /// Reconstructs a carrier of the concrete type named by `type_tag` from
    /// its canonical bytes. Only succeeds if some value of that concrete
    /// type has already been passed through [`Self::try_encode`] in this
    /// process — a bound inherent to reconstructing an erased type without
    /// a pre-registered type table.
    pub fn decode_erased(type_tag: &str, bytes: &[u8]) -> Option<FieldCarrier<'static>> {
        let decode = *decoders().lock().get(type_tag)?;
        let value = decode(bytes)?;
        Some(FieldCarrier { mode: StorageMode::OwnedConst, payload: Payload::Owned(value) })
    }

    /// True iff a read-only reference of type `T` can be retrieved right now.
    pub fn can_get<T: 'static>(&self) -> bool {
        self.inner().map_or(false, |v| v.as_any().is::<T>())
    }

    /// True iff a mutable reference of type `T` can be retrieved right now;
    /// only ever true for `StorageMode::OwnedMutable`.
    pub fn can_get_mut<T: 'static>(&self) -> bool {
        self.mode == StorageMode::OwnedMutable && self.can_get::<T>()
    }

    /// Returns a read-only reference to the stored value as `T`.
    pub fn get<T: 'static>(&self) -> Result<&T> {
        let inner = self.inner().ok_or(CacheError::Empty("field carrier"))?;
        inner.as_any().downcast_ref::<T>().ok_or_else(|| CacheError::TypeMismatch {
            requested: type_name::<T>(),
            stored: inner.type_name(),
        })
    }

    /// Returns a mutable reference to the stored value as `T`. Fails with
    /// `TypeMismatch` when the carrier isn't `OwnedMutable`, even if the
    /// stored type matches.
    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T> {
        if self.mode != StorageMode::OwnedMutable {
            let stored = self.type_tag();
            return Err(CacheError::TypeMismatch { requested: type_name::<T>(), stored });
        }
        match &mut self.payload {
            Payload::Owned(v) => {
                let stored = v.type_name();
                v.as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(CacheError::TypeMismatch { requested: type_name::<T>(), stored })
            }
            _ => Err(CacheError::Empty("field carrier")),
        }
    }

    /// Returns an owned copy of the stored value as `T`.
    pub fn value<T: Clone + 'static>(&self) -> Result<T> {
        self.get::<T>().map(Clone::clone)
    }

    /// Writes a text form of the stored value, falling back to
    /// `<type_tag @ address>` when the type has no `Display` impl.
    pub fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner() {
            Some(v) => v.fmt_value(f),
            None => write!(f, "{}", EMPTY_TYPE_TAG),
        }
    }

    /// `true` iff both carriers are non-empty, castable to a common
    /// read-only type, and equal under that type's `==`. Ignores storage
    /// mode.
    pub fn value_equal(&self, other: &FieldCarrier<'_>) -> bool {
        match (self.inner(), other.inner()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.type_name() == b.type_name() && a.dyn_eq(b),
            _ => false,
        }
    }

    /// `value_equal` plus an exact `storage_mode` match.
    pub fn structurally_equal(&self, other: &FieldCarrier<'_>) -> bool {
        self.mode == other.mode && self.value_equal(other)
    }

    /// Deep-copies this carrier. A `BorrowedConst` carrier clones into an
    /// `OwnedConst` one holding an independent copy; the clone never
    /// aliases the original referent.
    pub fn clone_owned(&self) -> FieldCarrier<'static> {
        match &self.payload {
            Payload::Empty => FieldCarrier::empty(),
            Payload::Owned(v) => FieldCarrier {
                mode: self.mode,
                payload: Payload::Owned(v.clone_boxed()),
            },
            Payload::Borrowed(v) => FieldCarrier {
                mode: StorageMode::OwnedConst,
                payload: Payload::Owned(v.clone_boxed()),
            },
        }
    }
}

impl<'a> Clone for FieldCarrier<'a> {
    /// Shallow clone: an owned payload is deep-copied, a borrowed payload
    /// stays borrowed from the same referent. Use [`Self::clone_owned`]
    /// when an independent, `'static` copy is required instead.
    fn clone(&self) -> Self {
        match &self.payload {
            Payload::Empty => FieldCarrier::empty(),
            Payload::Owned(v) => FieldCarrier { mode: self.mode, payload: Payload::Owned(v.clone_boxed()) },
            Payload::Borrowed(v) => FieldCarrier { mode: self.mode, payload: Payload::Borrowed(*v) },
        }
    }
}

impl fmt::Debug for FieldCarrier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCarrier")
            .field("mode", &self.mode)
            .field("type_tag", &self.type_tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_carrier_cast_always_fails() {
        let c = FieldCarrier::empty();
        assert!(c.get::<i32>().is_err());
        assert!(c.get::<String>().is_err());
        assert!(c.value_equal(&FieldCarrier::empty()));
    }

    #[test]
    fn owned_mutable_round_trip() {
        let mut c = FieldCarrier::owned_mutable(42i32);
        assert_eq!(*c.get::<i32>().unwrap(), 42);
        assert!(matches!(
            c.get::<String>(),
            Err(CacheError::TypeMismatch { .. })
        ));
        *c.get_mut::<i32>().unwrap() += 1;
        assert_eq!(*c.get::<i32>().unwrap(), 43);
    }

    #[test]
    fn borrowed_clone_does_not_alias() {
        let v = vec![9, 8, 7];
        let borrowed = FieldCarrier::borrowed(&v);
        assert_eq!(borrowed.get::<Vec<i32>>().unwrap().as_ptr(), v.as_ptr());

        let cloned = borrowed.clone_owned();
        assert_eq!(cloned.storage_mode(), StorageMode::OwnedConst);
        assert_eq!(cloned.get::<Vec<i32>>().unwrap(), &v);
        assert_ne!(cloned.get::<Vec<i32>>().unwrap().as_ptr(), v.as_ptr());
    }

    #[test]
    fn mutable_access_denied_outside_owned_mutable() {
        let v = 1i32;
        let mut borrowed = FieldCarrier::borrowed(&v);
        assert!(!borrowed.can_get_mut::<i32>());
        assert!(borrowed.get_mut::<i32>().is_err());
    }

    #[test]
    fn structural_equality_distinguishes_storage_mode() {
        let v = 5i32;
        let owned = FieldCarrier::owned_const(v);
        let borrowed = FieldCarrier::borrowed(&v);
        assert!(owned.value_equal(&borrowed));
        assert!(!owned.structurally_equal(&borrowed));
    }

    #[test]
    fn try_encode_round_trips_through_decode_erased() {
        let c = FieldCarrier::owned_const(42i32);
        let bytes = c.try_encode().expect("i32 is Serialize + DeserializeOwned");
        let decoded = FieldCarrier::decode_erased(c.type_tag(), &bytes).unwrap();
        assert_eq!(*decoded.get::<i32>().unwrap(), 42);
    }

    #[test]
    fn try_encode_is_none_for_a_type_without_serde_support() {
        #[derive(Clone, PartialEq)]
        struct Opaque(i32);
        let c = FieldCarrier::owned_const(Opaque(1));
        assert!(c.try_encode().is_none());
    }

    #[test]
    fn try_encode_is_none_for_an_empty_carrier() {
        assert!(FieldCarrier::empty().try_encode().is_none());
    }

    #[test]
    fn print_falls_back_without_display() {
        #[derive(Clone, PartialEq)]
        struct Opaque(i32);
        let c = FieldCarrier::owned_const(Opaque(1));
        let text = format!("{:?}", c.inner_debug_for_test());
        assert!(text.contains("Opaque"));
    }

    impl FieldCarrier<'_> {
        fn inner_debug_for_test(&self) -> String {
            struct D<'a, 'b>(&'b FieldCarrier<'a>);
            impl fmt::Display for D<'_, '_> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.print(f)
                }
            }
            format!("{}", D(self))
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property 3 (spec.md §8): for any owned carrier built from a
            // value with `==` defined, `cast_to::<T>() == v`.
            #[test]
            fn cast_round_trips_for_arbitrary_i32(v: i32) {
                let c = FieldCarrier::owned_const(v);
                prop_assert_eq!(*c.get::<i32>().unwrap(), v);
                prop_assert_eq!(c.value::<i32>().unwrap(), v);
            }

            #[test]
            fn cast_round_trips_for_arbitrary_string(v: String) {
                let c = FieldCarrier::owned_const(v.clone());
                prop_assert_eq!(c.get::<String>().unwrap(), &v);
            }

            #[test]
            fn cast_round_trips_for_arbitrary_vec(v: Vec<i32>) {
                let c = FieldCarrier::owned_const(v.clone());
                prop_assert_eq!(c.get::<Vec<i32>>().unwrap(), &v);
            }

            // Property 4: value_equal is symmetric for any pair of same-typed
            // values.
            #[test]
            fn value_equal_is_symmetric(a: i32, b: i32) {
                let ca = FieldCarrier::owned_const(a);
                let cb = FieldCarrier::owned_const(b);
                prop_assert_eq!(ca.value_equal(&cb), cb.value_equal(&ca));
            }

            // Property 2: cloning a borrowed carrier never aliases the
            // original referent, for arbitrary payloads.
            #[test]
            fn borrowed_clone_never_aliases(v: Vec<i32>) {
                let borrowed = FieldCarrier::borrowed(&v);
                let cloned = borrowed.clone_owned();
                prop_assert_eq!(cloned.storage_mode(), StorageMode::OwnedConst);
                prop_assert_eq!(cloned.get::<Vec<i32>>().unwrap(), &v);
                if !v.is_empty() {
                    prop_assert_ne!(cloned.get::<Vec<i32>>().unwrap().as_ptr(), v.as_ptr());
                }
            }
        }
    }
}
