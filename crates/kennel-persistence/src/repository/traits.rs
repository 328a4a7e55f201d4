//! # Repository Traits
//!
//! Abstract interface to the authoritative store. The cache layer never
//! builds queries or manages transactions; it only calls these methods.

use async_trait::async_trait;
use kennel_domain::{Entity, PageRequest};
use serde::Serialize;

use crate::error::Result;
use crate::paged::PagedResult;

/// Id type of a repository's entity
pub type EntityId<R> = <<R as Repository>::Entity as Entity>::Id;

// =============================================================================
// REPOSITORY
// =============================================================================

/// Authoritative store for one entity type
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fully hydrated DTO returned by every read
    type Entity: Entity;
    /// Create input
    type Draft: Send + 'static;
    /// Update input
    type Patch: Send + 'static;
    /// Listing filter; its JSON form is fingerprinted into the cache key
    type Filter: Serialize + Send + Sync;

    /// Get entity by ID
    async fn fetch_by_id(&self, id: &<Self::Entity as Entity>::Id) -> Result<Option<Self::Entity>>;

    /// Get one page of the unfiltered listing
    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<Self::Entity>>;

    /// Get one page of a filtered listing
    async fn fetch_filtered(
        &self,
        filter: &Self::Filter,
        request: PageRequest,
    ) -> Result<PagedResult<Self::Entity>>;

    /// Insert a new row and return its DTO
    async fn commit_create(&self, draft: Self::Draft) -> Result<Self::Entity>;

    /// Apply a patch. `None` if no row has this id.
    async fn commit_update(
        &self,
        id: &<Self::Entity as Entity>::Id,
        patch: Self::Patch,
    ) -> Result<Option<Self::Entity>>;

    /// Remove a row. Returns whether it existed.
    async fn commit_delete(&self, id: &<Self::Entity as Entity>::Id) -> Result<bool>;
}
