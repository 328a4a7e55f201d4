//! # Cache Module
//!
//! Key-value cache plumbing: the client contract and its backends, key
//! construction, and the payload codec.

pub mod client;
pub mod codec;
pub mod config;
pub mod keys;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_client;

pub use client::{shared_cache, CacheClient, SharedCacheClient};
pub use codec::{CacheCodec, FORMAT_VERSION};
pub use config::{CacheConfig, CacheTtl, DEFAULT_TTL};
pub use keys::{filter_fingerprint, CacheKey, KeyBuilder, Shape};
pub use memory::MemoryCacheClient;
#[cfg(feature = "redis")]
pub use redis_client::RedisCacheClient;
