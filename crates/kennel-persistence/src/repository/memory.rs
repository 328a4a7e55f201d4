//! In-memory reference repository.
//!
//! Behaves like the relational store as far as the cache layer can tell:
//! ids are allocated on create, listings are sorted and paginated, and
//! zero page bounds are rejected. Counts reads so tests can tell cache hits
//! from round-trips, and can be switched into a failing mode.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kennel_domain::{
    Dog, DogDraft, DogFilter, DogPatch, Entity, Litter, LitterDraft, LitterFilter, LitterPatch,
    Page, PageDraft, PageFilter, PagePatch, PageRequest, SortOrder,
};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::Repository;
use crate::error::{RepositoryError, Result};
use crate::paged::PagedResult;

/// Per-entity behaviour the in-memory store needs
pub trait MemoryRecord: Entity {
    type Draft: Send + 'static;
    type Patch: Send + 'static;
    type Filter: Serialize + Send + Sync;

    /// Id for the `seq`-th row created (1-based)
    fn allocate_id(seq: i64) -> Self::Id;

    fn from_draft(draft: Self::Draft, id: Self::Id, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn compare(&self, other: &Self, order: SortOrder) -> CmpOrdering;
}

impl MemoryRecord for Dog {
    type Draft = DogDraft;
    type Patch = DogPatch;
    type Filter = DogFilter;

    fn allocate_id(seq: i64) -> i64 {
        seq
    }

    fn from_draft(draft: DogDraft, id: i64, now: DateTime<Utc>) -> Self {
        draft.into_dog(id, now)
    }

    fn apply_patch(&mut self, patch: DogPatch, now: DateTime<Utc>) {
        patch.apply(self, now);
    }

    fn matches(&self, filter: &DogFilter) -> bool {
        filter.matches(self)
    }

    fn compare(&self, other: &Self, order: SortOrder) -> CmpOrdering {
        match order {
            SortOrder::IdAsc => self.id.cmp(&other.id),
            SortOrder::NameAsc => self.name.cmp(&other.name).then(self.id.cmp(&other.id)),
            SortOrder::NewestFirst => other
                .created_at
                .cmp(&self.created_at)
                .then(other.id.cmp(&self.id)),
        }
    }
}

impl MemoryRecord for Litter {
    type Draft = LitterDraft;
    type Patch = LitterPatch;
    type Filter = LitterFilter;

    fn allocate_id(seq: i64) -> i64 {
        seq
    }

    fn from_draft(draft: LitterDraft, id: i64, now: DateTime<Utc>) -> Self {
        draft.into_litter(id, now)
    }

    fn apply_patch(&mut self, patch: LitterPatch, now: DateTime<Utc>) {
        patch.apply(self, now);
    }

    fn matches(&self, filter: &LitterFilter) -> bool {
        filter.matches(self)
    }

    // Litters have no name; NameAsc falls back to id order
    fn compare(&self, other: &Self, order: SortOrder) -> CmpOrdering {
        match order {
            SortOrder::IdAsc | SortOrder::NameAsc => self.id.cmp(&other.id),
            SortOrder::NewestFirst => other
                .birth_date
                .cmp(&self.birth_date)
                .then(other.id.cmp(&self.id)),
        }
    }
}

impl MemoryRecord for Page {
    type Draft = PageDraft;
    type Patch = PagePatch;
    type Filter = PageFilter;

    fn allocate_id(_seq: i64) -> Uuid {
        Uuid::now_v7()
    }

    fn from_draft(draft: PageDraft, id: Uuid, now: DateTime<Utc>) -> Self {
        draft.into_page(id, now)
    }

    fn apply_patch(&mut self, patch: PagePatch, now: DateTime<Utc>) {
        patch.apply(self, now);
    }

    fn matches(&self, filter: &PageFilter) -> bool {
        filter.matches(self)
    }

    fn compare(&self, other: &Self, order: SortOrder) -> CmpOrdering {
        match order {
            SortOrder::IdAsc => self.id.cmp(&other.id),
            SortOrder::NameAsc => self.name.cmp(&other.name).then(self.id.cmp(&other.id)),
            SortOrder::NewestFirst => other
                .created_at
                .cmp(&self.created_at)
                .then(other.id.cmp(&self.id)),
        }
    }
}

/// In-memory [`Repository`] for any [`MemoryRecord`]
#[derive(Debug)]
pub struct MemoryRepository<E: MemoryRecord> {
    rows: RwLock<Vec<E>>,
    next_seq: AtomicI64,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl<E: MemoryRecord> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MemoryRecord> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_seq: AtomicI64::new(1),
            reads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every call fail with [`RepositoryError::Database`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database("repository unavailable".to_string()));
        }
        Ok(())
    }

    fn record_read(&self) -> Result<()> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn paginate<F>(&self, request: PageRequest, keep: F) -> Result<PagedResult<E>>
    where
        F: Fn(&E) -> bool,
    {
        request.validate()?;
        self.record_read()?;

        let rows = self.rows.read().await;
        let mut matching: Vec<&E> = rows.iter().filter(|&row| keep(row)).collect();
        matching.sort_by(|a, b| a.compare(b, request.sort));

        let total_count = matching.len() as u64;
        let offset = request.offset().unwrap_or(0);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(request.page_size as usize)
            .cloned()
            .collect();

        Ok(PagedResult::new(items, total_count))
    }
}

#[async_trait]
impl<E: MemoryRecord> Repository for MemoryRepository<E> {
    type Entity = E;
    type Draft = E::Draft;
    type Patch = E::Patch;
    type Filter = E::Filter;

    async fn fetch_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        self.record_read()?;
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id() == id).cloned())
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<E>> {
        self.paginate(request, |_| true).await
    }

    async fn fetch_filtered(&self, filter: &E::Filter, request: PageRequest) -> Result<PagedResult<E>> {
        self.paginate(request, |row| row.matches(filter)).await
    }

    async fn commit_create(&self, draft: E::Draft) -> Result<E> {
        self.check()?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let entity = E::from_draft(draft, E::allocate_id(seq), Utc::now());

        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id() == entity.id()) {
            return Err(RepositoryError::WriteConflict(format!(
                "{} {} already exists",
                E::KIND,
                entity.id()
            )));
        }
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn commit_update(&self, id: &E::Id, patch: E::Patch) -> Result<Option<E>> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|row| row.id() == id) else {
            return Ok(None);
        };
        row.apply_patch(patch, Utc::now());
        Ok(Some(row.clone()))
    }

    async fn commit_delete(&self, id: &E::Id) -> Result<bool> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id() != id);
        Ok(rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_domain::Gender;

    async fn seeded(names: &[&str]) -> MemoryRepository<Dog> {
        let repo = MemoryRepository::new();
        for name in names {
            repo.commit_create(DogDraft::new(*name, Gender::Female))
                .await
                .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = seeded(&["Bea", "Cleo"]).await;
        let dot = repo.commit_create(DogDraft::new("Dot", Gender::Male)).await.unwrap();
        assert_eq!(dot.id, 3);
    }

    #[tokio::test]
    async fn test_page_bounds_and_total() {
        let repo = seeded(&["Bea", "Cleo", "Dot", "Eve", "Fay"]).await;
        let page = repo.fetch_page(PageRequest::new(2, 2)).await.unwrap();

        let ids: Vec<_> = page.items.iter().map(|d| d.id).collect();
        assert_eq!(ids, [3, 4]);
        assert_eq!(page.total_count, 5);

        let past_end = repo.fetch_page(PageRequest::new(9, 2)).await.unwrap();
        assert!(past_end.is_empty());
        assert_eq!(past_end.total_count, 5);
    }

    #[tokio::test]
    async fn test_zero_page_rejected() {
        let repo = seeded(&["Bea"]).await;
        for request in [PageRequest::new(0, 10), PageRequest::new(1, 0)] {
            let err = repo.fetch_page(request).await.unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidQuery(_)));
        }
    }

    #[tokio::test]
    async fn test_name_sort() {
        let repo = seeded(&["Cleo", "Ace", "Bea"]).await;
        let page = repo
            .fetch_page(PageRequest::new(1, 10).sorted(SortOrder::NameAsc))
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Ace", "Bea", "Cleo"]);
    }

    #[tokio::test]
    async fn test_filter_counts_only_matches() {
        let repo = seeded(&["Bea", "Cleo"]).await;
        repo.commit_create(DogDraft::new("Rex", Gender::Male)).await.unwrap();

        let males = repo
            .fetch_filtered(&DogFilter::gender(Gender::Male), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(males.total_count, 1);
        assert_eq!(males.items[0].name, "Rex");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = seeded(&["Bea"]).await;
        assert!(repo.commit_update(&9, DogPatch::name("X")).await.unwrap().is_none());
        assert!(!repo.commit_delete(&9).await.unwrap());
        assert!(repo.commit_delete(&1).await.unwrap());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let repo = seeded(&["Bea"]).await;
        repo.set_failing(true);
        assert!(matches!(
            repo.fetch_by_id(&1).await.unwrap_err(),
            RepositoryError::Database(_)
        ));
        assert_eq!(repo.read_count(), 0);
    }

    #[tokio::test]
    async fn test_pages_get_uuid_ids() {
        let repo = MemoryRepository::<Page>::new();
        let draft = PageDraft {
            name: "About".to_string(),
            slug: "about".to_string(),
            content: String::new(),
            meta_description: None,
            is_published: true,
        };
        let page = repo.commit_create(draft).await.unwrap();
        assert!(repo.fetch_by_id(&page.id).await.unwrap().is_some());
    }
}
