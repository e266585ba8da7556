//! Component C — one callback slot inside a module's `submodules` map.

use std::any::TypeId;
use std::sync::Arc;

use parking_lot::Mutex;
use pluginplay_cache::FieldMap;

use crate::error::{PlayError, Result};
use crate::property_type::PropertyType;
use crate::shell::ModuleShell;

/// Declares one callback point an [`Implementation`](crate::shell::Implementation)
/// expects: the name it's addressed by, the property type its bindee must
/// satisfy, and the sentinel inputs used for readiness checks before a
/// module is bound.
pub struct SubmoduleSchema {
    pub name: String,
    pub expected_type: TypeId,
    pub expected_type_name: &'static str,
    pub representative_inputs: FieldMap<'static>,
}

/// Holds the property-type contract and, optionally, the bound module for
/// one callback point.
pub struct SubmoduleRequest {
    expected_type: Option<TypeId>,
    expected_type_name: Option<&'static str>,
    representative_inputs: FieldMap<'static>,
    bound_module: Option<Arc<Mutex<ModuleShell>>>,
    description: Option<String>,
}

impl SubmoduleRequest {
    /// An unset request: no expected type, no binding.
    pub fn new() -> Self {
        Self {
            expected_type: None,
            expected_type_name: None,
            representative_inputs: FieldMap::new(),
            bound_module: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds a request from an implementation's declared
    /// [`SubmoduleSchema`], before any module is bound.
    pub(crate) fn from_schema(schema: &SubmoduleSchema) -> Self {
        Self {
            expected_type: Some(schema.expected_type),
            expected_type_name: Some(schema.expected_type_name),
            representative_inputs: schema.representative_inputs.clone(),
            bound_module: None,
            description: None,
        }
    }

    /// Sets or refines the expected property type. Fails with
    /// [`PlayError::TypeMismatch`] if a bound module doesn't satisfy `PT`.
    pub fn set_expected_type<PT: PropertyType>(&mut self) -> Result<()> {
        if let Some(bound) = &self.bound_module {
            let satisfies = bound.lock().satisfies(TypeId::of::<PT>());
            if !satisfies {
                return Err(PlayError::TypeMismatch {
                    requested: PT::name(),
                    stored: self.expected_type_name.unwrap_or("<unset>"),
                });
            }
        }
        self.expected_type = Some(TypeId::of::<PT>());
        self.expected_type_name = Some(PT::name());
        self.representative_inputs = PT::input_schema();
        Ok(())
    }

    /// Binds `module` to this request. Rejects a module that doesn't
    /// advertise the expected property type among its satisfied set.
    pub fn bind(&mut self, module: Arc<Mutex<ModuleShell>>) -> Result<()> {
        let expected = self.expected_type.ok_or(PlayError::Empty("expected property type"))?;
        if !module.lock().satisfies(expected) {
            return Err(PlayError::PropertyTypeNotSatisfied(
                self.expected_type_name.unwrap_or("<unset>"),
            ));
        }
        self.bound_module = Some(module);
        Ok(())
    }

    /// `true` iff an expected type is set, a module is bound, and that
    /// module reports ready given this request's representative inputs.
    pub fn ready(&self) -> bool {
        self.expected_type.is_some()
            && self
                .bound_module
                .as_ref()
                .map_or(false, |m| m.lock().ready(&self.representative_inputs))
    }

    /// Locks the bound module (which recursively locks its own
    /// submodules first). Fails [`PlayError::NotReady`] without mutating
    /// anything if this request, or any part of the bound module's own
    /// subtree, isn't ready.
    pub fn lock(&self) -> Result<()> {
        if !self.ready() {
            return Err(PlayError::NotReady(self.diagnose()));
        }
        self.bound_module.as_ref().unwrap().lock().lock()
    }

    /// Partitions this request's readiness failure: `Some` iff unready,
    /// naming the submodule-level report the parent shell folds in under
    /// this request's name.
    pub fn diagnose(&self) -> crate::error::NotReadyReport {
        match &self.bound_module {
            None => crate::error::NotReadyReport::default(),
            Some(module) => module.lock().diagnose_not_ready(&self.representative_inputs),
        }
    }

    /// The uuid of the bound module, used by the fingerprint encoder to
    /// fold submodule identity into a cache key. `None` if unbound or the
    /// bound module has no uuid assigned.
    pub fn bound_uuid(&self) -> Option<uuid::Uuid> {
        self.bound_module.as_ref().and_then(|m| m.lock().uuid())
    }

    /// `true` iff every submodule transitively reachable from the bound
    /// module is also memoizable.
    pub fn is_memoizable(&self) -> bool {
        self.bound_module.as_ref().map_or(true, |m| m.lock().is_effectively_memoizable())
    }

    pub fn expected_type(&self) -> Option<TypeId> {
        self.expected_type
    }

    pub fn bound_module(&self) -> Option<&Arc<Mutex<ModuleShell>>> {
        self.bound_module.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Default for SubmoduleRequest {
    fn default() -> Self {
        Self::new()
    }
}
