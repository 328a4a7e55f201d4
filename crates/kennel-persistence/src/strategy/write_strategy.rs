//! Write-side cache maintenance.
//!
//! [`InvalidationCoordinator::apply`] runs after the repository commit has
//! succeeded and brings every cached shape of the entity type back in line:
//!
//! | mutation | `single`                 | `page`                    | `filtered`  |
//! |----------|--------------------------|---------------------------|-------------|
//! | create   | written                  | entity appended           | untouched   |
//! | update   | deleted (or overwritten) | patched where present     | all deleted |
//! | delete   | deleted                  | all deleted (or left)     | all deleted |
//!
//! Entities copied into other DTOs (see [`Entity::EMBEDDED_IN`]) reach
//! further. After any mutation every cached entry of a holder type is
//! inspected item by item, and entries that embed a copy of the entity, or
//! that the entity names as its holder through a back reference, are
//! deleted. A puppy rename therefore drops the litters listing it, and a new
//! dog drops the cached entries of its parents.
//!
//! Cache faults are logged and counted, never returned: a committed write
//! is successful whether or not the cache could be corrected, and TTL
//! expiry bounds any staleness left behind.
//!
//! ## Coherence window
//!
//! Nothing orders a concurrent reader's miss-populate against this pass.
//! A reader that loaded the old row before the commit and writes it back
//! after invalidation has run leaves a stale entry until its TTL expires.
//! This window is accepted; there is no lock around check-then-populate.

use kennel_domain::{Embedding, Entity, EntityKind};
use serde_json::Value;

use crate::cache::{CacheCodec, CacheKey, CacheTtl, KeyBuilder, Shape, SharedCacheClient};
use crate::error::CacheError;
use crate::paged::PagedResult;

/// What to do with the `single` entry when its entity is updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SingleUpdatePolicy {
    /// Remove it; the next read reloads from the repository
    #[default]
    Delete,
    /// Write the updated DTO in its place
    Overwrite,
}

/// What to do with cached pages when an entity is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageDeletePolicy {
    /// Remove every cached page of the entity type
    #[default]
    DeleteAll,
    /// Keep pages; the deleted row may be listed until the pages expire
    LeaveUntilExpiry,
}

/// Per-entity invalidation choices. The default is the strict variant of
/// both; relaxed variants are explicit opt-ins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationPolicy {
    pub single_on_update: SingleUpdatePolicy,
    pub pages_on_delete: PageDeletePolicy,
}

impl InvalidationPolicy {
    #[must_use]
    pub fn with_single_on_update(mut self, policy: SingleUpdatePolicy) -> Self {
        self.single_on_update = policy;
        self
    }

    #[must_use]
    pub fn with_pages_on_delete(mut self, policy: PageDeletePolicy) -> Self {
        self.pages_on_delete = policy;
        self
    }
}

/// A committed change to one entity
#[derive(Debug)]
pub enum Mutation<'a, E: Entity> {
    Created(&'a E),
    Updated(&'a E),
    Deleted(&'a E::Id),
}

// Manual impls: derive would demand `E: Copy`
impl<E: Entity> Clone for Mutation<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Entity> Copy for Mutation<'_, E> {}

impl<E: Entity> Mutation<'_, E> {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "create",
            Self::Updated(_) => "update",
            Self::Deleted(_) => "delete",
        }
    }

    pub fn id(&self) -> &E::Id {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity.id(),
            Self::Deleted(id) => id,
        }
    }
}

/// Cache operations performed by one [`InvalidationCoordinator::apply`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// `single` entries written
    pub written: usize,
    /// Keys removed
    pub deleted: usize,
    /// Cached pages rewritten with a patched item list
    pub patched_pages: usize,
    /// Cache faults absorbed
    pub faults: usize,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.faults == 0
    }
}

/// Keeps cached shapes coherent with committed writes
#[derive(Clone)]
pub struct InvalidationCoordinator {
    cache: SharedCacheClient,
    keys: KeyBuilder,
    codec: CacheCodec,
    ttl: CacheTtl,
}

impl InvalidationCoordinator {
    pub fn new(cache: SharedCacheClient, keys: KeyBuilder, ttl: CacheTtl) -> Self {
        Self {
            cache,
            keys,
            codec: CacheCodec::default(),
            ttl,
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: CacheCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Reconcile the cache with a committed mutation.
    pub async fn apply<E: Entity>(
        &self,
        mutation: Mutation<'_, E>,
        policy: &InvalidationPolicy,
    ) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        match mutation {
            Mutation::Created(entity) => {
                self.write_single(entity, &mut report).await;
                self.patch_pages(&mut report, |page: PagedResult<E>| {
                    Some(page.with_appended(entity.clone()))
                })
                .await;
                self.drop_holders(entity.id(), Some(entity), &mut report).await;
            }
            Mutation::Updated(entity) => {
                match policy.single_on_update {
                    SingleUpdatePolicy::Delete => {
                        let key = self.keys.single::<E>(entity.id());
                        self.delete_key(&key, &mut report).await;
                    }
                    SingleUpdatePolicy::Overwrite => self.write_single(entity, &mut report).await,
                }
                self.patch_pages(&mut report, |page: PagedResult<E>| {
                    page.with_replaced(entity.id(), entity.clone())
                })
                .await;
                self.delete_shape(E::KIND, Shape::Filtered, &mut report).await;
                self.drop_holders(entity.id(), Some(entity), &mut report).await;
            }
            Mutation::Deleted(id) => {
                let key = self.keys.single::<E>(id);
                self.delete_key(&key, &mut report).await;
                match policy.pages_on_delete {
                    PageDeletePolicy::DeleteAll => {
                        self.delete_shape(E::KIND, Shape::Page, &mut report).await;
                    }
                    PageDeletePolicy::LeaveUntilExpiry => {
                        tracing::debug!(kind = %E::KIND, id = %id, "Leaving cached pages to expire");
                    }
                }
                self.delete_shape(E::KIND, Shape::Filtered, &mut report).await;
                self.drop_holders::<E>(id, None, &mut report).await;
            }
        }

        if report.is_clean() {
            tracing::debug!(
                kind = %E::KIND,
                id = %mutation.id(),
                mutation = mutation.label(),
                written = report.written,
                deleted = report.deleted,
                patched_pages = report.patched_pages,
                "Cache reconciled"
            );
        } else {
            tracing::warn!(
                kind = %E::KIND,
                id = %mutation.id(),
                mutation = mutation.label(),
                faults = report.faults,
                "Cache reconciliation incomplete, stale entries expire by TTL"
            );
        }

        report
    }

    async fn write_single<E: Entity>(&self, entity: &E, report: &mut InvalidationReport) {
        let key = self.keys.single::<E>(entity.id());
        match self.store(&key, entity).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to write single entry");
                report.faults += 1;
                // Never leave the previous version behind
                self.delete_key(&key, report).await;
            }
        }
    }

    async fn delete_key(&self, key: &CacheKey, report: &mut InvalidationReport) {
        match self.cache.delete(key.as_str()).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to delete cache entry");
                report.faults += 1;
            }
        }
    }

    async fn delete_shape(&self, kind: EntityKind, shape: Shape, report: &mut InvalidationReport) {
        let pattern = self.keys.shape_pattern(kind, shape);
        match self.cache.delete_matching(&pattern).await {
            Ok(count) => report.deleted += usize::try_from(count).unwrap_or(usize::MAX),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Failed to delete cache entries");
                report.faults += 1;
            }
        }
    }

    /// Rewrite every live cached page for which `patch` returns a new page.
    async fn patch_pages<E, F>(&self, report: &mut InvalidationReport, patch: F)
    where
        E: Entity,
        F: Fn(PagedResult<E>) -> Option<PagedResult<E>>,
    {
        let pattern = self.keys.shape_pattern(E::KIND, Shape::Page);
        let keys = match self.cache.keys_matching(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Failed to enumerate cached pages");
                report.faults += 1;
                return;
            }
        };

        for key in keys {
            let bytes = match self.cache.get(&key).await {
                Ok(Some(bytes)) => bytes,
                // Expired between enumeration and read
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to read cached page");
                    report.faults += 1;
                    continue;
                }
            };

            let page = match self.codec.decode::<PagedResult<E>>(&bytes) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable cached page");
                    self.delete_raw(&key, report).await;
                    continue;
                }
            };

            let Some(patched) = patch(page) else {
                continue;
            };

            match self.store_raw(&key, &patched, self.ttl.page).await {
                Ok(()) => report.patched_pages += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to rewrite cached page");
                    report.faults += 1;
                    // A page we could not patch must not keep serving the old row
                    self.delete_raw(&key, report).await;
                }
            }
        }
    }

    /// Delete every cached holder entry that embeds a copy of `id` or that
    /// `entity` lists through one of its back references.
    async fn drop_holders<E: Entity>(
        &self,
        id: &E::Id,
        entity: Option<&E>,
        report: &mut InvalidationReport,
    ) {
        if E::EMBEDDED_IN.is_empty() {
            return;
        }

        let (target, current) = match (serde_json::to_value(id), entity.map(serde_json::to_value)) {
            (Ok(target), None) => (target, None),
            (Ok(target), Some(Ok(current))) => (target, Some(current)),
            (Err(e), _) | (_, Some(Err(e))) => {
                tracing::warn!(kind = %E::KIND, id = %id, error = %e, "Cannot inspect embedded copies");
                report.faults += 1;
                return;
            }
        };

        for embedding in E::EMBEDDED_IN {
            let holder_ids: Vec<&Value> = current
                .as_ref()
                .map(|current| {
                    embedding
                        .back_refs
                        .iter()
                        .filter_map(|field| current.get(*field))
                        .filter(|value| !value.is_null())
                        .collect()
                })
                .unwrap_or_default();

            for shape in Shape::ALL {
                let pattern = self.keys.shape_pattern(embedding.holder, shape);
                let keys = match self.cache.keys_matching(&pattern).await {
                    Ok(keys) => keys,
                    Err(e) => {
                        tracing::warn!(pattern = %pattern, error = %e, "Failed to enumerate holder entries");
                        report.faults += 1;
                        continue;
                    }
                };

                for key in keys {
                    let bytes = match self.cache.get(&key).await {
                        Ok(Some(bytes)) => bytes,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "Failed to read holder entry");
                            report.faults += 1;
                            continue;
                        }
                    };

                    // An entry we cannot read cannot be shown to be clean
                    let stale = self.codec.decode::<Value>(&bytes).map_or(true, |value| {
                        holds_copy(&value, shape, embedding, &target, &holder_ids)
                    });
                    if stale {
                        self.delete_raw(&key, report).await;
                    }
                }
            }
        }
    }

    async fn delete_raw(&self, key: &str, report: &mut InvalidationReport) {
        match self.cache.delete(key).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to delete cache entry");
                report.faults += 1;
            }
        }
    }

    async fn store<E: Entity>(&self, key: &CacheKey, entity: &E) -> Result<(), CacheError> {
        let ttl = self.ttl.for_shape(key.shape());
        self.store_raw(key.as_str(), entity, ttl).await
    }

    async fn store_raw<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: std::time::Duration,
    ) -> Result<(), CacheError> {
        let bytes = self.codec.encode(value)?;
        self.cache.set(key, &bytes, ttl).await
    }
}

/// Whether a cached holder value (one DTO, or a page of them) embeds a copy
/// of `target` or is one of `holder_ids`.
fn holds_copy(
    value: &Value,
    shape: Shape,
    embedding: &Embedding,
    target: &Value,
    holder_ids: &[&Value],
) -> bool {
    let affected = |holder: &Value| {
        let embeds = holder
            .get(embedding.field)
            .and_then(Value::as_array)
            .is_some_and(|copies| copies.iter().any(|copy| copy.get("id") == Some(target)));
        embeds || holder.get("id").is_some_and(|id| holder_ids.contains(&id))
    };

    match shape {
        Shape::Single => affected(value),
        Shape::Page | Shape::Filtered => value
            .get("items")
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(affected)),
    }
}
