//! # Cached Repository
//!
//! Service glue binding a [`Repository`] to the cache layer. Reads go
//! through the [`ReadThroughCache`]; writes commit to the repository first
//! and then hand the committed DTO to the [`InvalidationCoordinator`].
//!
//! Repository errors surface unchanged. Cache faults never do, except from
//! [`CacheAdmin`], where the operator asked for the cache action explicitly.

use kennel_domain::{Entity, EntityKind, PageRequest};
use serde::Serialize;

use super::traits::Repository;
use crate::cache::{CacheConfig, KeyBuilder, SharedCacheClient};
use crate::error::{CacheResult, Result};
use crate::paged::PagedResult;
use crate::strategy::{
    Fetched, InvalidationCoordinator, InvalidationPolicy, Mutation, ReadStrategy, ReadThroughCache,
};

// =============================================================================
// CACHE LAYER
// =============================================================================

/// Everything a service needs to talk to the cache, built once and cloned
/// into each entity service
#[derive(Clone)]
pub struct CacheLayer {
    client: SharedCacheClient,
    keys: KeyBuilder,
    reader: ReadThroughCache,
    coordinator: InvalidationCoordinator,
}

impl CacheLayer {
    /// # Errors
    ///
    /// Fails if the configured environment tag cannot be used in keys.
    pub fn new(client: SharedCacheClient, config: &CacheConfig) -> CacheResult<Self> {
        let keys = KeyBuilder::new(config.environment.clone())?;
        let strategy = if config.enabled {
            ReadStrategy::CacheFirst
        } else {
            ReadStrategy::DbOnly
        };

        let reader = ReadThroughCache::new(client.clone(), config.ttl).with_strategy(strategy);
        let coordinator = InvalidationCoordinator::new(client.clone(), keys.clone(), config.ttl);

        Ok(Self {
            client,
            keys,
            reader,
            coordinator,
        })
    }

    pub fn client(&self) -> &SharedCacheClient {
        &self.client
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn read_strategy(&self) -> ReadStrategy {
        self.reader.strategy()
    }

    pub fn admin(&self) -> CacheAdmin {
        CacheAdmin::new(self)
    }
}

// =============================================================================
// CACHED REPOSITORY
// =============================================================================

/// Entity service with read-through caching and write-side invalidation
pub struct CachedRepository<R: Repository> {
    repo: R,
    cache: CacheLayer,
    policy: InvalidationPolicy,
}

impl<R: Repository> CachedRepository<R> {
    /// Wrap `repo` with the strict default invalidation policy.
    pub fn new(repo: R, cache: CacheLayer) -> Self {
        Self {
            repo,
            cache,
            policy: InvalidationPolicy::default(),
        }
    }

    /// Opt this entity type into a different invalidation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &InvalidationPolicy {
        &self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Get entity by ID.
    ///
    /// # Errors
    ///
    /// Returns the repository's error on a miss that fails to load.
    pub async fn get(&self, id: &<R::Entity as Entity>::Id) -> Result<Option<Fetched<R::Entity>>> {
        let key = self.cache.keys.single::<R::Entity>(id);
        self.cache
            .reader
            .get_or_load(&key, || self.repo.fetch_by_id(id))
            .await
    }

    /// Get one page of the unfiltered listing.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::InvalidQuery`](crate::error::RepositoryError::InvalidQuery)
    /// for a zero page or page size, otherwise the repository's error.
    pub async fn get_page(&self, request: PageRequest) -> Result<Fetched<PagedResult<R::Entity>>> {
        request.validate()?;
        let key = self.cache.keys.page::<R::Entity>(&request);
        self.cache
            .reader
            .get_or_fetch(&key, || self.repo.fetch_page(request))
            .await
    }

    /// Get one page of a filtered listing.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_page`].
    pub async fn get_filtered(
        &self,
        filter: &R::Filter,
        request: PageRequest,
    ) -> Result<Fetched<PagedResult<R::Entity>>> {
        request.validate()?;
        match self.cache.keys.filtered::<R::Entity, _>(filter, &request) {
            Ok(key) => {
                self.cache
                    .reader
                    .get_or_fetch(&key, || self.repo.fetch_filtered(filter, request))
                    .await
            }
            Err(e) => {
                let kind = <R::Entity as Entity>::KIND;
                tracing::warn!(kind = %kind, error = %e, "Filter not cacheable, reading repository");
                let page = self.repo.fetch_filtered(filter, request).await?;
                Ok(Fetched::loaded(page))
            }
        }
    }

    /// Create an entity, then cache it and splice it into cached pages.
    ///
    /// # Errors
    ///
    /// Only the repository's commit error. Cache faults are absorbed.
    pub async fn create(&self, draft: R::Draft) -> Result<R::Entity> {
        let entity = self.repo.commit_create(draft).await?;
        self.cache
            .coordinator
            .apply(Mutation::Created(&entity), &self.policy)
            .await;
        Ok(entity)
    }

    /// Update an entity, then invalidate its cached copies.
    ///
    /// `Ok(None)` if no entity has this id; the cache is left alone.
    ///
    /// # Errors
    ///
    /// Only the repository's commit error. Cache faults are absorbed.
    pub async fn update(
        &self,
        id: &<R::Entity as Entity>::Id,
        patch: R::Patch,
    ) -> Result<Option<R::Entity>> {
        let Some(entity) = self.repo.commit_update(id, patch).await? else {
            return Ok(None);
        };
        self.cache
            .coordinator
            .apply(Mutation::Updated(&entity), &self.policy)
            .await;
        Ok(Some(entity))
    }

    /// Delete an entity, then invalidate its cached copies.
    ///
    /// `Ok(false)` if no entity has this id; the cache is left alone.
    ///
    /// # Errors
    ///
    /// Only the repository's commit error. Cache faults are absorbed.
    pub async fn delete(&self, id: &<R::Entity as Entity>::Id) -> Result<bool> {
        if !self.repo.commit_delete(id).await? {
            return Ok(false);
        }
        self.cache
            .coordinator
            .apply(Mutation::<R::Entity>::Deleted(id), &self.policy)
            .await;
        Ok(true)
    }
}

// =============================================================================
// ADMIN
// =============================================================================

/// Cache backend status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub reachable: bool,
}

/// Operator actions on the cache
#[derive(Clone)]
pub struct CacheAdmin {
    client: SharedCacheClient,
    keys: KeyBuilder,
}

impl CacheAdmin {
    pub fn new(layer: &CacheLayer) -> Self {
        Self {
            client: layer.client.clone(),
            keys: layer.keys.clone(),
        }
    }

    /// Drop every entry in the store, across all environments sharing it.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the operator needs to know the flush
    /// did not happen.
    pub async fn clear_all(&self) -> CacheResult<()> {
        match self.client.flush_all().await {
            Ok(()) => {
                tracing::info!(backend = self.client.backend_name(), "Cache flushed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(backend = self.client.backend_name(), error = %e, "Cache flush failed");
                Err(e)
            }
        }
    }

    /// Drop every entry of one entity kind in this environment.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn clear_kind(&self, kind: EntityKind) -> CacheResult<u64> {
        let pattern = self.keys.kind_pattern(kind);
        let deleted = self.client.delete_matching(&pattern).await?;
        tracing::info!(kind = %kind, deleted, "Cache entries cleared");
        Ok(deleted)
    }

    pub async fn health(&self) -> CacheHealth {
        let reachable = match self.client.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cache ping failed");
                false
            }
        };
        CacheHealth {
            backend: self.client.backend_name(),
            reachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheClient;
    use crate::repository::MemoryRepository;
    use kennel_domain::{Dog, DogDraft, Gender, Litter};
    use std::sync::Arc;

    fn layer(memory: &Arc<MemoryCacheClient>, enabled: bool) -> CacheLayer {
        let config = CacheConfig {
            environment: "test".to_string(),
            enabled,
            ..CacheConfig::default()
        };
        CacheLayer::new(memory.clone(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_bad_environment_rejected() {
        let config = CacheConfig {
            environment: "a:b".to_string(),
            ..CacheConfig::default()
        };
        assert!(CacheLayer::new(Arc::new(MemoryCacheClient::new()), &config).is_err());
    }

    #[tokio::test]
    async fn test_disabled_cache_reads_repository() {
        let memory = Arc::new(MemoryCacheClient::new());
        let service = CachedRepository::new(MemoryRepository::<Dog>::new(), layer(&memory, false));
        let dog = service.create(DogDraft::new("Bea", Gender::Female)).await.unwrap();

        assert!(!service.get(&dog.id).await.unwrap().unwrap().is_hit());
        assert!(!service.get(&dog.id).await.unwrap().unwrap().is_hit());
        assert_eq!(service.repository().read_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_page_request_skips_cache() {
        let memory = Arc::new(MemoryCacheClient::new());
        let service = CachedRepository::new(MemoryRepository::<Dog>::new(), layer(&memory, true));

        assert!(service.get_page(PageRequest::new(0, 10)).await.is_err());
        assert_eq!(service.repository().read_count(), 0);
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_kind_spares_other_kinds() {
        let memory = Arc::new(MemoryCacheClient::new());
        let cache = layer(&memory, true);
        let dogs = CachedRepository::new(MemoryRepository::<Dog>::new(), cache.clone());
        let litters = CachedRepository::new(MemoryRepository::<Litter>::new(), cache.clone());

        dogs.get_page(PageRequest::default()).await.unwrap();
        litters.get_page(PageRequest::default()).await.unwrap();

        assert_eq!(cache.admin().clear_kind(EntityKind::Dog).await.unwrap(), 1);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_health_and_failed_flush() {
        let memory = Arc::new(MemoryCacheClient::new());
        let admin = layer(&memory, true).admin();

        assert_eq!(
            admin.health().await,
            CacheHealth {
                backend: "memory",
                reachable: true
            }
        );

        memory.set_online(false);
        assert!(!admin.health().await.reachable);
        assert!(admin.clear_all().await.unwrap_err().is_unavailable());
    }
}
