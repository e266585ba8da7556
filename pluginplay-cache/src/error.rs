use std::fmt;

/// Failure modes shared by the field/cache substrate.
///
/// Mirrors the error taxonomy PluginPlay's execution shell surfaces
/// unmodified to its own callers (see `pluginplay::error::PlayError`).
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// A carrier, proxy map, or database lookup found no value.
    #[error("{0} is empty")]
    Empty(&'static str),

    /// The requested static type didn't match what's actually stored, or a
    /// read-only value was requested as mutable.
    #[error("type mismatch: requested `{requested}`, stored `{stored}`")]
    TypeMismatch {
        requested: &'static str,
        stored: &'static str,
    },

    /// A proxy map was presented to `unproxy` that this mapper never
    /// produced via `proxy`.
    #[error("proxy map `{0}` is not known to this mapper")]
    UnknownProxy(String),

    /// An adapter was constructed around a null/missing wrapped adapter.
    #[error("cannot wrap a missing adapter: {0}")]
    InvalidWrap(&'static str),

    /// An external, disk-resident backend reported a failure.
    #[error("backend failure: {0}")]
    BackendFailure(#[from] BackendError),
}

/// Opaque error surfaced by an [`ExternalBackend`](crate::database::external::ExternalBackend).
#[derive(Debug)]
pub struct BackendError(pub Box<dyn std::error::Error + Send + Sync>);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CacheError>;
