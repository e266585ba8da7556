//! §3.9 — typed configuration for assembling a module cache's adapter chain.
//!
//! Grounded on `original_source/src/pluginplay/cache/database/database_factory.cpp`,
//! which assembles a chain from a small set of boolean/path options rather
//! than making callers hand-wire every adapter layer themselves.

use std::path::PathBuf;

/// Describes how [`crate::module_cache`] should assemble a module's adapter
/// chain.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Serialize proxied keys/values with a [`crate::codec::Codec`] before
    /// they reach the in-memory store. Required when an external backend is
    /// configured, since backends only accept binary keys/values.
    pub serialize: bool,

    /// Root directory for the persistent on-disk layout described in
    /// spec.md §6: one subtree for the proxied-input/proxied-result
    /// database, one for the value-to-uuid database. `None` disables the
    /// external backend entirely, leaving the in-memory layer as the only
    /// store.
    pub external_backend_root: Option<PathBuf>,

    /// Whether the in-memory layer should checkpoint to its backup after
    /// every insert, rather than only on an explicit `checkpoint`/`dump`
    /// call. Off by default, matching spec.md §5's "no background
    /// eviction" / explicit-persistence model.
    pub eager_checkpoint: bool,
}

impl CacheConfig {
    /// An in-memory-only configuration: no serialization, no backend.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A configuration with an external, disk-resident backend rooted at
    /// `root`. Implies `serialize = true`, since backends only accept
    /// binary keys/values (spec.md §6).
    pub fn with_external_backend(root: impl Into<PathBuf>) -> Self {
        Self { serialize: true, external_backend_root: Some(root.into()), eager_checkpoint: false }
    }
}
