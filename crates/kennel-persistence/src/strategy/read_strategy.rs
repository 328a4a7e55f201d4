//! Read-through cache.
//!
//! A hit is decoded and returned without touching the repository. A miss,
//! an unreachable backend, or an undecodable entry all fall through to the
//! loader; a successful load is written back exactly once. Loader errors
//! propagate untouched and nothing is cached for them.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheCodec, CacheKey, CacheTtl, SharedCacheClient};
use crate::error::{CacheError, Result};

/// Read strategy - determines whether reads consult the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Check cache first, fall back to the repository on miss and populate
    #[default]
    CacheFirst,
    /// Only read from the repository, never touch the cache
    DbOnly,
}

/// Where a value was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Repository,
}

/// A read result tagged with its source
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: ReadSource,
}

impl<T> Fetched<T> {
    pub fn cached(value: T) -> Self {
        Self {
            value,
            source: ReadSource::Cache,
        }
    }

    pub fn loaded(value: T) -> Self {
        Self {
            value,
            source: ReadSource::Repository,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Read-through cache over a shared client
#[derive(Clone)]
pub struct ReadThroughCache {
    cache: SharedCacheClient,
    codec: CacheCodec,
    ttl: CacheTtl,
    strategy: ReadStrategy,
}

impl ReadThroughCache {
    pub fn new(cache: SharedCacheClient, ttl: CacheTtl) -> Self {
        Self {
            cache,
            codec: CacheCodec::default(),
            ttl,
            strategy: ReadStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: CacheCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    /// Read a value that may not exist (lookup by id).
    ///
    /// `Ok(None)` means the repository has no such row; absence is never
    /// cached.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error unchanged.
    pub async fn get_or_load<T, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<Option<Fetched<T>>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(Some(Fetched::cached(value)));
        }

        let Some(value) = loader().await? else {
            tracing::debug!(key = %key, "Not found in repository, nothing cached");
            return Ok(None);
        };

        self.populate(key, &value).await;
        Ok(Some(Fetched::loaded(value)))
    }

    /// Read a value that always exists (listings).
    ///
    /// # Errors
    ///
    /// Propagates the loader's error unchanged.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(Fetched::cached(value));
        }

        let value = loader().await?;
        self.populate(key, &value).await;
        Ok(Fetched::loaded(value))
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if self.strategy == ReadStrategy::DbOnly {
            return None;
        }

        match self.cache.get(key.as_str()).await {
            Ok(Some(bytes)) => match self.codec.decode(&bytes) {
                Ok(value) => {
                    tracing::debug!(key = %key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                    if let Err(e) = self.cache.delete(key.as_str()).await {
                        tracing::warn!(key = %key, error = %e, "Failed to delete corrupt entry");
                    }
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to repository");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if self.strategy == ReadStrategy::DbOnly {
            return;
        }

        let ttl = self.ttl.for_shape(key.shape());
        if let Err(e) = self.store(key, value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to populate cache");
        }
    }

    async fn store<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let bytes = self.codec.encode(value)?;
        self.cache.set(key.as_str(), &bytes, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheClient, KeyBuilder, MemoryCacheClient};
    use crate::error::RepositoryError;
    use kennel_domain::Dog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryCacheClient>, ReadThroughCache, CacheKey) {
        let memory = Arc::new(MemoryCacheClient::new());
        let reader = ReadThroughCache::new(memory.clone(), CacheTtl::default());
        let key = KeyBuilder::new("test").unwrap().single::<Dog>(&1);
        (memory, reader, key)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (_, reader, key) = setup();
        let loads = AtomicUsize::new(0);
        let counter = &loads;

        let first = reader
            .get_or_load(&key, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RepositoryError>(Some(99_i32))
            })
            .await
            .unwrap()
            .unwrap();
        assert!(!first.is_hit());
        assert_eq!(first.value, 99);

        let second = reader
            .get_or_load(&key, || async { Ok::<_, RepositoryError>(Some(0_i32)) })
            .await
            .unwrap()
            .unwrap();
        assert!(second.is_hit());
        assert_eq!(second.value, 99);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let (memory, reader, key) = setup();
        let result = reader
            .get_or_load::<i32, _, _>(&key, || async { Ok::<_, RepositoryError>(None) })
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_loader_error_propagates_uncached() {
        let (memory, reader, key) = setup();
        let err = reader
            .get_or_fetch::<i32, _, _>(&key, || async {
                Err(RepositoryError::Database("connection reset".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_replaced() {
        let (memory, reader, key) = setup();
        memory
            .set(key.as_str(), b"{broken", Duration::from_secs(60))
            .await
            .unwrap();

        let fetched = reader
            .get_or_fetch(&key, || async { Ok::<_, RepositoryError>(7_i32) })
            .await
            .unwrap();
        assert!(!fetched.is_hit());
        assert_eq!(fetched.value, 7);

        let bytes = memory.get(key.as_str()).await.unwrap().unwrap();
        assert_eq!(CacheCodec::default().decode::<i32>(&bytes).unwrap(), 7);
    }

    #[tokio::test]
    async fn test_db_only_skips_cache() {
        let (memory, reader, key) = setup();
        let reader = reader.with_strategy(ReadStrategy::DbOnly);

        let fetched = reader
            .get_or_fetch(&key, || async { Ok::<_, RepositoryError>(5_i32) })
            .await
            .unwrap();
        assert!(!fetched.is_hit());
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_cache_falls_back() {
        let (memory, reader, key) = setup();
        memory.set_online(false);

        let fetched = reader
            .get_or_fetch(&key, || async { Ok::<_, RepositoryError>(3_i32) })
            .await
            .unwrap();
        assert_eq!(fetched.value, 3);
    }
}
