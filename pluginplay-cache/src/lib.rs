#![deny(unsafe_code, clippy::all)]

//! Hierarchical, type-erased key/value cache backing PluginPlay module
//! memoization.
//!
//! This crate is the leaf of the workspace: it has no notion of modules,
//! submodules, or execution, only the substrate `pluginplay` builds
//! memoization on top of.
//!
//! - [`field`] — [`field::FieldCarrier`], a type-erased container for one
//!   value of any `Clone + PartialEq + Send + Sync + 'static` type.
//! - [`field_map`] — [`field_map::FieldMap`], a name-keyed collection of
//!   field carriers.
//! - [`uuid_proxy`] — turns a [`field_map::FieldMap`] into a
//!   hashable/serializable [`uuid_proxy::ProxyFieldMap`] and back.
//! - [`database`] — the uniform [`database::Database`] interface and the
//!   adapters that compose into a full cache chain.
//! - [`module_cache`] — assembles a module's full adapter chain from a
//!   [`config::CacheConfig`], in single-threaded ([`module_cache::local`])
//!   and shared ([`module_cache::sync`]) flavors.
//! - [`codec`] — pluggable serialization for adapters that need bytes.
//! - [`config`] — typed knobs for [`module_cache`]'s chain assembly.
//! - [`error`] — the [`error::CacheError`] taxonomy shared by every module
//!   in this crate.
//!
//! Non-test code stays free of `unsafe`; the one exception lives in a
//! `#[cfg(test)]` block in [`database::memory`] and is documented there.

pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod field;
pub mod field_map;
pub mod module_cache;
pub mod uuid_proxy;

pub use codec::{BincodeCodec, Codec};
pub use config::CacheConfig;
pub use database::Database;
pub use error::{CacheError, Result};
pub use field::{FieldCarrier, StorageMode};
pub use field_map::FieldMap;
pub use module_cache::ModuleCache;
pub use uuid_proxy::{ProxyFieldMap, ProxyMapMaker, SharedUuidMapper, UuidMapper};
