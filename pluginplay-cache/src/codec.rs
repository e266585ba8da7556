//! §6.1 — the serialization codec delegated to by [`crate::database::serializing`].
//!
//! PluginPlay's spec deliberately does not define a wire format; it only
//! requires round-trip fidelity. `Codec` is the seam a user plugs a format
//! into; [`BincodeCodec`] is the default, built the way the rest of the
//! retrieved corpus serializes on-disk/wire state: `serde` shapes plus
//! `bincode` bytes.

use crate::error::{BackendError, CacheError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes and decodes arbitrary `serde`-compatible values to/from bytes.
///
/// The adapter chain makes no assumption about the resulting bytes beyond
/// round-trip fidelity: `decode(&encode(v)) == v`.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// The default [`Codec`], backed by `bincode`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| CacheError::BackendFailure(BackendError(Box::new(e))))
    }
}
