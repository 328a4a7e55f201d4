//! Key-value store contract consumed by the cache layer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Thin interface over an external key-value store.
///
/// Implementations report backend faults as [`CacheError::Unavailable`];
/// callers inside this crate decide whether to absorb them.
///
/// [`CacheError::Unavailable`]: crate::error::CacheError::Unavailable
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Raw bytes stored under `key`, `None` on miss or expiry.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Remove a single key. Returns whether it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Enumerate live keys matching a glob pattern (`*`, `?`).
    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Remove several keys at once. Returns how many existed.
    async fn delete_many(&self, keys: &[String]) -> CacheResult<u64>;

    /// Drop every entry in the store.
    async fn flush_all(&self) -> CacheResult<()>;

    /// Round-trip to the backend.
    async fn ping(&self) -> CacheResult<()>;

    /// Short backend identifier for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Remove every key matching `pattern`.
    async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let keys = self.keys_matching(pattern).await?;
        self.delete_many(&keys).await
    }
}

/// Shared cache client handle, injected into every service
pub type SharedCacheClient = Arc<dyn CacheClient>;

/// Wrap a concrete client into a shared handle
pub fn shared_cache<C: CacheClient + 'static>(client: C) -> SharedCacheClient {
    Arc::new(client)
}
