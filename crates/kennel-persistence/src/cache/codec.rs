//! Wire format for cached values.
//!
//! Values are JSON wrapped in a versioned envelope:
//!
//! ```text
//! {"v":1,"data":{...}}
//! ```
//!
//! Timestamps go through chrono's serde support and land as RFC 3339
//! strings. Anything that does not decode into the expected type at the
//! expected version is reported as [`CacheError::Corruption`], which the
//! read path treats as a miss.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Current envelope version. Bump when a cached DTO changes incompatibly.
pub const FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    v: u16,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    v: u16,
    data: T,
}

/// Encodes and decodes cache payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCodec {
    version: u16,
}

impl Default for CacheCodec {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
        }
    }
}

impl CacheCodec {
    /// Codec pinned to a specific envelope version.
    #[must_use]
    pub fn with_version(version: u16) -> Self {
        Self { version }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if `value` has no JSON form.
    pub fn encode<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(&EnvelopeRef {
            v: self.version,
            data: value,
        })
        .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`CacheError::Corruption`] for malformed bytes, a payload
    /// that does not match `T`, or an envelope from another version.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        let envelope: Envelope<T> =
            serde_json::from_slice(bytes).map_err(|e| CacheError::Corruption(e.to_string()))?;

        if envelope.v != self.version {
            return Err(CacheError::Corruption(format!(
                "envelope version {} does not match expected {}",
                envelope.v, self.version
            )));
        }
        Ok(envelope.data)
    }
}
