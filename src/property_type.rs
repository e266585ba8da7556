//! The property-type contract: an immutable schema a module promises to
//! satisfy, realized as one Rust type per property type rather than a
//! runtime-registered schema object, so that checking whether a module
//! satisfies a contract stays inside ordinary trait dispatch.

use pluginplay_cache::{FieldCarrier, FieldMap};
use std::any::TypeId;

use crate::error::{PlayError, Result};

/// A static schema: an ordered set of named, typed input fields (some with
/// defaults) and an ordered set of named, typed result fields.
///
/// A property type is identified by its Rust type: two property types are
/// the same iff `TypeId::of::<A>() == TypeId::of::<B>()`. `property_id`
/// gives the shell and submodule request a uniform way to compare against
/// the type a module actually satisfies without turning every call site
/// generic.
pub trait PropertyType: 'static {
    /// Arguments a caller supplies in declared order.
    type Input;
    /// Values a caller receives back in declared order.
    type Result;

    /// Human-readable name, used in diagnostics and `PropertyTypeNotSatisfied`.
    fn name() -> &'static str;

    /// Declares the input schema: field names, in order, each carrying a
    /// sentinel (typed but unset) default value where the property type
    /// defines one. Used to build a submodule request's
    /// `representative_inputs` without real data.
    fn input_schema() -> FieldMap<'static>;

    /// Declares the result schema, analogous to [`Self::input_schema`].
    fn result_schema() -> FieldMap<'static>;

    /// Packs `args` into a field map per the declared input order.
    fn wrap_inputs(args: Self::Input) -> FieldMap<'static>;

    /// Extracts `Self::Result` from `results` per the declared result
    /// order. Fails with [`PlayError::UnknownName`] if a declared field is
    /// missing, or [`PlayError::TypeMismatch`] if a field's stored type
    /// doesn't match what the property type expects.
    fn unwrap_results(results: FieldMap<'static>) -> Result<Self::Result>;
}

/// The `TypeId` a [`PropertyType`] is identified by.
pub fn property_id<PT: PropertyType>() -> TypeId {
    TypeId::of::<PT>()
}

/// Looks up a single required, typed field by name, turning a missing
/// field into [`PlayError::UnknownName`] rather than [`PlayError::Empty`] —
/// appropriate when unwrapping a property type's declared schema, where a
/// missing field is a programmer error in the implementation, not a normal
/// empty-carrier state.
pub fn require_field<'a, T: Clone + PartialEq + 'static>(
    map: &'a FieldMap<'static>,
    name: &str,
) -> Result<T> {
    let carrier: &FieldCarrier<'static> =
        map.get(name).ok_or_else(|| PlayError::UnknownName(name.to_string()))?;
    carrier.value::<T>().map_err(|_| PlayError::TypeMismatch {
        requested: std::any::type_name::<T>(),
        stored: carrier.type_tag(),
    })
}
