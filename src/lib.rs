//! Runtime for composing scientific software from pluggable, strongly-typed
//! computational modules (spec.md §1).
//!
//! This crate supplies components C (submodule request), G (module
//! execution shell), and H (user cache), plus the property-type contract
//! and the crate's own error taxonomy. The type-erased field carrier,
//! field map, and the full memoization substrate (database adapter chain,
//! UUID proxy mapper, module cache) live in [`pluginplay_cache`], which
//! this crate re-exports the commonly needed pieces of.

pub mod error;
pub mod fingerprint;
pub mod property_type;
pub mod shell;
pub mod submodule;
pub mod user_cache;

pub use error::{NotReadyReport, PlayError, Result};
pub use property_type::PropertyType;
pub use shell::{CallRecord, Implementation, ModuleShell};
pub use submodule::{SubmoduleRequest, SubmoduleSchema};
pub use user_cache::UserCache;

pub use pluginplay_cache::{CacheConfig, Database, FieldCarrier, FieldMap, ModuleCache, StorageMode};

#[cfg(test)]
mod tests {
    use super::*;
    use pluginplay_cache::SharedUuidMapper;
    use std::any::TypeId;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct Increment;

    impl PropertyType for Increment {
        type Input = i32;
        type Result = i32;

        fn name() -> &'static str {
            "Increment"
        }

        fn input_schema() -> FieldMap<'static> {
            let mut m = FieldMap::new();
            m.insert("n", FieldCarrier::owned_const(0i32));
            m
        }

        fn result_schema() -> FieldMap<'static> {
            let mut m = FieldMap::new();
            m.insert("r", FieldCarrier::owned_const(0i32));
            m
        }

        fn wrap_inputs(n: i32) -> FieldMap<'static> {
            let mut m = FieldMap::new();
            m.insert("n", FieldCarrier::owned_const(n));
            m
        }

        fn unwrap_results(results: FieldMap<'static>) -> Result<i32> {
            property_type::require_field(&results, "r")
        }
    }

    struct IncrementImpl {
        id: uuid::Uuid,
        calls: std::sync::atomic::AtomicI32,
    }

    impl Implementation for IncrementImpl {
        fn id(&self) -> uuid::Uuid {
            self.id
        }

        fn default_inputs(&self) -> FieldMap<'static> {
            let mut m = FieldMap::new();
            m.insert("n", FieldCarrier::empty());
            m
        }

        fn default_results(&self) -> FieldMap<'static> {
            let mut m = FieldMap::new();
            m.insert("r", FieldCarrier::empty());
            m
        }

        fn default_submodules(&self) -> Vec<SubmoduleSchema> {
            Vec::new()
        }

        fn satisfied_property_types(&self) -> Vec<TypeId> {
            vec![TypeId::of::<Increment>()]
        }

        fn run(
            &self,
            inputs: &FieldMap<'static>,
            _submodules: &BTreeMap<String, SubmoduleRequest>,
        ) -> Result<FieldMap<'static>> {
            let n = property_type::require_field::<i32>(inputs, "n")?;
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut out = FieldMap::new();
            out.insert("r", FieldCarrier::owned_const(n + 1));
            Ok(out)
        }
    }

    #[test]
    fn memoized_run_does_not_rerun_body() {
        let config = CacheConfig::in_memory();
        let module_uuid = uuid::Uuid::new_v4();
        let cache = ModuleCache::new(&config, SharedUuidMapper::new(), module_uuid);

        let mut shell = ModuleShell::new();
        let implementation = Arc::new(IncrementImpl {
            id: uuid::Uuid::new_v4(),
            calls: std::sync::atomic::AtomicI32::new(0),
        });
        shell.set_implementation(implementation.clone()).unwrap();
        shell.set_uuid(module_uuid).unwrap();
        shell.set_cache_handle(Arc::new(parking_lot::Mutex::new(cache))).unwrap();

        let mut inputs = FieldMap::new();
        inputs.insert("n", FieldCarrier::owned_const(1i32));

        let first = shell.run(inputs.clone()).unwrap();
        assert_eq!(*first.get("r").unwrap().get::<i32>().unwrap(), 2);

        let second = shell.run(inputs).unwrap();
        assert_eq!(*second.get("r").unwrap().get::<i32>().unwrap(), 2);
        assert_eq!(implementation.calls.load(std::sync::atomic::Ordering::SeqCst), 1, "body must not rerun on a cache hit");
    }
}
