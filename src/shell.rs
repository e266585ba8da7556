//! Component G — the per-module execution shell.

use std::any::TypeId;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pluginplay_cache::{FieldMap, ModuleCache};
use uuid::Uuid;

use crate::error::{NotReadyReport, PlayError, Result};
use crate::fingerprint;
use crate::property_type::PropertyType;
use crate::submodule::{SubmoduleRequest, SubmoduleSchema};

/// The algorithm and default schemas a [`ModuleShell`] wraps. One
/// implementation per module; acquired once and never replaced.
pub trait Implementation: Send + Sync {
    /// A stable identity for this implementation, used as one of the
    /// fingerprint's inputs so that two different implementations never
    /// collide in the same shared cache even if bound to shells with the
    /// same uuid by mistake.
    fn id(&self) -> Uuid;

    /// The module's declared input fields and their defaults.
    fn default_inputs(&self) -> FieldMap<'static>;

    /// The module's declared result field names (schema only; values are
    /// produced by [`Self::run`]).
    fn default_results(&self) -> FieldMap<'static>;

    /// The module's declared submodule callback points.
    fn default_submodules(&self) -> Vec<SubmoduleSchema>;

    /// Property types this implementation satisfies.
    fn satisfied_property_types(&self) -> Vec<TypeId>;

    /// Runs the module body against `inputs` and `submodules`, producing a
    /// result map shaped like [`Self::default_results`].
    fn run(
        &self,
        inputs: &FieldMap<'static>,
        submodules: &BTreeMap<String, SubmoduleRequest>,
    ) -> Result<FieldMap<'static>>;
}

/// One call's timing/outcome record, as used by [`ModuleShell::profile_info`].
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub elapsed: Duration,
    pub cache_hit: bool,
}

/// The per-module state machine: readiness, locking, run dispatch, timing,
/// and memoization orchestration (spec.md §3.5, §4.4).
pub struct ModuleShell {
    implementation: Option<Arc<dyn Implementation>>,
    inputs: FieldMap<'static>,
    submodules: BTreeMap<String, SubmoduleRequest>,
    results_schema: FieldMap<'static>,
    property_types: HashSet<TypeId>,
    locked: bool,
    memoizable: bool,
    uuid: Option<Uuid>,
    cache_handle: Option<Arc<Mutex<ModuleCache>>>,
    timer_log: Vec<CallRecord>,
}

impl ModuleShell {
    /// A default-constructed shell: no implementation, cannot run.
    pub fn new() -> Self {
        Self {
            implementation: None,
            inputs: FieldMap::new(),
            submodules: BTreeMap::new(),
            results_schema: FieldMap::new(),
            property_types: HashSet::new(),
            locked: false,
            memoizable: true,
            uuid: None,
            cache_handle: None,
            timer_log: Vec::new(),
        }
    }

    /// Acquires `implementation`, initializing inputs/submodules/property
    /// types from its defaults. Fails with [`PlayError::Locked`] if an
    /// implementation has already been acquired — a shell's implementation
    /// is set once and never replaced (spec.md §3.5 lifecycle).
    pub fn set_implementation(&mut self, implementation: Arc<dyn Implementation>) -> Result<()> {
        if self.implementation.is_some() {
            return Err(PlayError::Locked);
        }
        self.inputs = implementation.default_inputs();
        self.results_schema = implementation.default_results();
        self.submodules = implementation
            .default_submodules()
            .into_iter()
            .map(|schema| (schema.name.clone(), SubmoduleRequest::from_schema(&schema)))
            .collect();
        self.property_types = implementation.satisfied_property_types().into_iter().collect();
        self.implementation = Some(implementation);
        Ok(())
    }

    /// Assigns this shell's uuid. Absence of a uuid disables memoization
    /// regardless of [`Self::set_memoizable`].
    pub fn set_uuid(&mut self, uuid: Uuid) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        self.uuid = Some(uuid);
        Ok(())
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    /// Attaches the per-module cache this shell memoizes through.
    pub fn set_cache_handle(&mut self, handle: Arc<Mutex<ModuleCache>>) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        self.cache_handle = Some(handle);
        Ok(())
    }

    /// Sets the `memoizable` flag. A facade or lambda-style module sets
    /// this `false` so non-deterministic or test-only bodies never pollute
    /// the cache.
    pub fn set_memoizable(&mut self, memoizable: bool) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        self.memoizable = memoizable;
        Ok(())
    }

    pub fn satisfies(&self, property_type: TypeId) -> bool {
        self.property_types.contains(&property_type)
    }

    /// Declares an additional property type this module satisfies, beyond
    /// its implementation's own declared set.
    pub fn add_property_type(&mut self, property_type: TypeId) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        self.property_types.insert(property_type);
        Ok(())
    }

    /// Overrides the `name` input field. Fails with
    /// [`PlayError::TypeMismatch`] if `name` already holds a non-empty
    /// value of a different type than `value` (spec.md §4.4); a field with
    /// no default (still empty) accepts its first value unconditionally,
    /// since that's exactly how it establishes a concrete type.
    pub fn change_input(&mut self, name: &str, value: pluginplay_cache::FieldCarrier<'static>) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        let existing = self
            .inputs
            .get(name)
            .ok_or_else(|| PlayError::UnknownName(name.to_string()))?;
        if !existing.is_empty() && existing.type_tag() != value.type_tag() {
            return Err(PlayError::TypeMismatch {
                requested: value.type_tag(),
                stored: existing.type_tag(),
            });
        }
        self.inputs.insert(name, value);
        Ok(())
    }

    pub fn change_submodule(&mut self, name: &str, module: Arc<Mutex<ModuleShell>>) -> Result<()> {
        if self.locked {
            return Err(PlayError::Locked);
        }
        let request = self
            .submodules
            .get_mut(name)
            .ok_or_else(|| PlayError::UnknownName(name.to_string()))?;
        request.bind(module)
    }

    /// A module is ready iff every input field is bound or overridden by
    /// `extra_inputs`, and every submodule request is ready.
    pub fn ready(&self, extra_inputs: &FieldMap<'static>) -> bool {
        self.diagnose_not_ready(extra_inputs).is_ready()
    }

    /// Partitions readiness failure into unset inputs and unready
    /// submodules (recursively).
    pub fn diagnose_not_ready(&self, extra_inputs: &FieldMap<'static>) -> NotReadyReport {
        let mut report = NotReadyReport::default();
        for (name, carrier) in self.inputs.iter() {
            let overridden = extra_inputs.get(name).map_or(false, |c| !c.is_empty());
            if carrier.is_empty() && !overridden {
                report.unset_inputs.push(name.to_string());
            }
        }
        for (name, request) in self.submodules.iter() {
            if !request.ready() {
                report.unready_submodules.push((name.clone(), Box::new(request.diagnose())));
            }
        }
        report
    }

    /// `true` iff `memoizable` is set, a uuid and cache handle are
    /// present, and every bound submodule is also effectively memoizable
    /// (spec.md §4.4's conjunction).
    pub fn is_effectively_memoizable(&self) -> bool {
        self.memoizable
            && self.uuid.is_some()
            && self.cache_handle.is_some()
            && self.submodules.values().all(SubmoduleRequest::is_memoizable)
    }

    /// Locks all ready submodules first, then this shell. Fails
    /// [`PlayError::NotReady`] without mutating any state if any submodule
    /// isn't ready (strong guarantee — readiness is checked in full before
    /// any lock is committed).
    pub fn lock(&mut self) -> Result<()> {
        if self.locked {
            return Ok(());
        }
        let report = self.diagnose_not_ready(&FieldMap::new());
        if !report.is_ready() {
            return Err(PlayError::NotReady(report));
        }
        for request in self.submodules.values() {
            request.lock()?;
        }
        self.locked = true;
        Ok(())
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// The core run algorithm (spec.md §4.4, steps 1–10).
    #[tracing::instrument(level = "debug", skip(self, input_overrides), fields(uuid = ?self.uuid))]
    pub fn run(&mut self, input_overrides: FieldMap<'static>) -> Result<FieldMap<'static>> {
        for (name, value) in input_overrides.iter() {
            if value.is_empty() {
                return Err(PlayError::InputsNotReady(name.to_string()));
            }
        }

        let effective = self.inputs.merged_with(&input_overrides);
        if !self.ready(&input_overrides) {
            return Err(PlayError::NotReady(self.diagnose_not_ready(&input_overrides)));
        }

        self.lock()?;

        let implementation =
            self.implementation.as_ref().ok_or(PlayError::Empty("implementation"))?.clone();

        let memoize = self.is_effectively_memoizable();
        let key = if memoize {
            Some(fingerprint::build(&effective, &self.submodules, implementation.id())?)
        } else {
            None
        };

        let start = Instant::now();

        if let (true, Some(key), Some(cache)) = (memoize, &key, &self.cache_handle) {
            let mut cache = cache.lock();
            if cache.contains(key) {
                let result = cache.get(key)?;
                let elapsed = start.elapsed();
                tracing::debug!(?elapsed, "cache hit");
                self.timer_log.push(CallRecord { elapsed, cache_hit: true });
                return Ok(result);
            }
        }

        let result = implementation.run(&effective, &self.submodules)?;

        if let (true, Some(key), Some(cache)) = (memoize, &key, &self.cache_handle) {
            cache.lock().insert(key.clone(), result.clone())?;
        }

        let elapsed = start.elapsed();
        tracing::debug!(?elapsed, memoize, "run complete");
        self.timer_log.push(CallRecord { elapsed, cache_hit: false });
        Ok(result)
    }

    /// Validates `PT` is satisfied, packs `args` via `PT`, runs, and
    /// unpacks the result via `PT`.
    pub fn run_as<PT: PropertyType>(&mut self, args: PT::Input) -> Result<PT::Result> {
        if !self.satisfies(TypeId::of::<PT>()) {
            return Err(PlayError::PropertyTypeNotSatisfied(PT::name()));
        }
        let inputs = PT::wrap_inputs(args);
        let results = self.run(inputs)?;
        PT::unwrap_results(results)
    }

    /// A human-readable trace: this shell's call timings plus each
    /// submodule's own trace, indented two spaces per level.
    pub fn profile_info(&self) -> String {
        self.profile_info_at(0)
    }

    fn profile_info_at(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        let mut out = String::new();
        for (i, record) in self.timer_log.iter().enumerate() {
            out.push_str(&format!(
                "{indent}call {i}: {:?} ({})\n",
                record.elapsed,
                if record.cache_hit { "cache hit" } else { "ran body" }
            ));
        }
        for (name, request) in self.submodules.iter() {
            if let Some(module) = request.bound_module() {
                out.push_str(&format!("{indent}{name}:\n"));
                out.push_str(&module.lock().profile_info_at(depth + 1));
            }
        }
        out
    }
}

impl Default for ModuleShell {
    fn default() -> Self {
        Self::new()
    }
}
