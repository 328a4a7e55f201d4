//! Persistence layer error types
//!
//! Two families with different propagation rules: [`CacheError`] is always
//! absorbed inside the cache layer, [`RepositoryError`] always reaches the
//! caller unchanged.

use kennel_domain::{DomainError, EntityKind};
use thiserror::Error;

/// Cache-side faults. Never surfaced past the read-through cache or the
/// invalidation coordinator.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt cache entry: {0}")]
    Corruption(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Invalid cache key component: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Backend could not be reached (as opposed to bad data).
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Authoritative store errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: EntityKind, key: String },

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => Self::NotFound {
                entity_type,
                key: id,
            },
            DomainError::InvalidPageRequest { .. } => Self::InvalidQuery(err.to_string()),
        }
    }
}

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

pub type CacheResult<T> = std::result::Result<T, CacheError>;
