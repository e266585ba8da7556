use std::fmt;

/// Failure modes for the execution shell and its surrounding contracts.
///
/// Mirrors [`pluginplay_cache::CacheError`]'s taxonomy where the two
/// overlap (`Empty`, `TypeMismatch`, `InvalidWrap`) and adds the kinds
/// specific to readiness, locking, and property-type dispatch.
#[derive(thiserror::Error, Debug)]
pub enum PlayError {
    /// A shell, submodule request, or field holds no value where one was
    /// expected.
    #[error("{0} is empty")]
    Empty(&'static str),

    /// A requested static type didn't match what's actually stored.
    #[error("type mismatch: requested `{requested}`, stored `{stored}`")]
    TypeMismatch {
        requested: &'static str,
        stored: &'static str,
    },

    /// A field, submodule, or property-type name wasn't declared.
    #[error("unknown name `{0}`")]
    UnknownName(String),

    /// Mutation attempted on a locked shell.
    #[error("shell is locked")]
    Locked,

    /// A readiness check failed; carries the partitioned diagnosis.
    #[error("not ready: {0:?}")]
    NotReady(NotReadyReport),

    /// `run_as` invoked with a property type the shell doesn't satisfy, or a
    /// submodule bound to a module that doesn't satisfy the expected type.
    #[error("property type `{0}` is not satisfied")]
    PropertyTypeNotSatisfied(&'static str),

    /// One of the supplied input overrides is itself an empty field.
    #[error("input override `{0}` is not ready")]
    InputsNotReady(String),

    /// An adapter or shell was constructed around a missing/null wrapped
    /// value.
    #[error("cannot wrap a missing value: {0}")]
    InvalidWrap(&'static str),

    /// Propagated unmodified from the cache substrate.
    #[error(transparent)]
    BackendFailure(#[from] pluginplay_cache::CacheError),
}

/// The result of [`crate::shell::ModuleShell::diagnose_not_ready`]:
/// unset input fields and, recursively, each unready submodule's own
/// report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotReadyReport {
    pub unset_inputs: Vec<String>,
    pub unready_submodules: Vec<(String, Box<NotReadyReport>)>,
}

impl NotReadyReport {
    pub fn is_ready(&self) -> bool {
        self.unset_inputs.is_empty() && self.unready_submodules.is_empty()
    }
}

impl fmt::Display for NotReadyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, PlayError>;
