//! # Kennel Persistence Library
//!
//! Read-through caching and write-side invalidation for the kennel catalog.
//!
//! ## Architecture
//!
//! Entity services wrap an authoritative [`Repository`] with a cache layer.
//! Reads consult the cache first; writes commit to the repository and then
//! reconcile every cached shape that could hold a stale copy:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CachedRepository (per entity type)              │
//! │    get / get_page / get_filtered / create / update / delete  │
//! └─────────────────────────────────────────────────────────────┘
//!          │ reads                                │ writes
//!          ▼                                      ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │    ReadThroughCache     │   │   InvalidationCoordinator    │
//! └─────────────────────────┘   └──────────────────────────────┘
//!          │         │                            │
//!          │         ▼                            ▼
//!          │  ┌────────────────────────────────────────────────┐
//!          │  │  KeyBuilder + CacheCodec → CacheClient (Redis)  │
//!          │  └────────────────────────────────────────────────┘
//!          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Repository (source of truth)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `redis`: Enable the Redis cache backend (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kennel_persistence::{connect, CacheConfig, CacheLayer, CachedRepository, MemoryRepository};
//!
//! let config = CacheConfig::from_env();
//! let cache = CacheLayer::new(connect(&config).await?, &config)?;
//!
//! let dogs = CachedRepository::new(MemoryRepository::<Dog>::new(), cache.clone());
//! let page = dogs.get_page(PageRequest::new(1, 10)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod paged;
pub mod repository;
pub mod strategy;

// Re-export commonly used types
pub use cache::{
    CacheClient, CacheCodec, CacheConfig, CacheKey, CacheTtl, KeyBuilder, MemoryCacheClient,
    Shape, SharedCacheClient,
};
pub use error::{CacheError, CacheResult, RepositoryError, Result};
pub use paged::PagedResult;
pub use repository::{
    CacheAdmin, CacheHealth, CacheLayer, CachedRepository, MemoryRepository, Repository,
};
pub use strategy::{
    Fetched, InvalidationCoordinator, InvalidationPolicy, InvalidationReport, Mutation,
    PageDeletePolicy, ReadSource, ReadStrategy, ReadThroughCache, SingleUpdatePolicy,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Connect the configured cache backend.
///
/// # Errors
///
/// Returns [`CacheError::Unavailable`] if Redis cannot be reached.
#[cfg(feature = "redis")]
pub async fn connect(config: &CacheConfig) -> CacheResult<SharedCacheClient> {
    let client = cache::RedisCacheClient::connect(&config.url).await?;
    tracing::info!(url = %config.redacted_url(), environment = %config.environment, "Connected to Redis");
    Ok(cache::shared_cache(client))
}

/// Without a Redis backend the cache lives in process memory.
///
/// # Errors
///
/// Never fails; the signature matches the Redis variant.
#[cfg(not(feature = "redis"))]
pub async fn connect(config: &CacheConfig) -> CacheResult<SharedCacheClient> {
    tracing::info!(environment = %config.environment, "Using in-memory cache");
    Ok(cache::shared_cache(MemoryCacheClient::new()))
}
