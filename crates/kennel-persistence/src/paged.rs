//! Paginated result value and its pure cache-patching transforms.

use kennel_domain::Entity;
use serde::{Deserialize, Serialize};

/// One page of items plus the total row count of the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: Entity> PagedResult<E> {
    pub fn contains(&self, id: &E::Id) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    /// Splice a newly created entity onto the end of the page.
    ///
    /// The page may grow past its nominal size and ignores the listing's
    /// sort order. If the id is already present (a concurrent reader cached
    /// the page after the commit) the item is replaced instead, so a page
    /// never holds duplicates.
    #[must_use]
    pub fn with_appended(mut self, item: E) -> Self {
        if let Some(slot) = self.items.iter_mut().find(|i| i.id() == item.id()) {
            *slot = item;
        } else {
            self.items.push(item);
            self.total_count += 1;
        }
        self
    }

    /// Swap the item with `id` for `item` in place.
    ///
    /// Returns `None` when the page does not contain `id`, so callers can
    /// skip rewriting untouched pages.
    #[must_use]
    pub fn with_replaced(mut self, id: &E::Id, item: E) -> Option<Self> {
        let slot = self.items.iter_mut().find(|i| i.id() == id)?;
        *slot = item;
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kennel_domain::{Dog, DogDraft, Gender};

    fn dog(id: i64, name: &str) -> Dog {
        DogDraft::new(name, Gender::Female).into_dog(id, Utc::now())
    }

    #[test]
    fn test_append_grows_page_and_total() {
        let page = PagedResult::new(vec![dog(1, "Bea"), dog(2, "Cleo")], 2);
        let page = page.with_appended(dog(3, "Rex"));

        assert_eq!(page.len(), 3);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items[2].name, "Rex");
    }

    #[test]
    fn test_append_existing_id_replaces() {
        let page = PagedResult::new(vec![dog(1, "Bea")], 1);
        let page = page.with_appended(dog(1, "Bea II"));

        assert_eq!(page.len(), 1);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "Bea II");
    }

    #[test]
    fn test_replace_keeps_position() {
        let page = PagedResult::new(vec![dog(1, "Bea"), dog(2, "Cleo"), dog(3, "Dot")], 10);
        let page = page.with_replaced(&2, dog(2, "Max")).unwrap();

        let names: Vec<_> = page.items.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Bea", "Max", "Dot"]);
        assert_eq!(page.total_count, 10);
    }

    #[test]
    fn test_replace_absent_id_is_none() {
        let page = PagedResult::new(vec![dog(1, "Bea")], 1);
        assert!(page.with_replaced(&9, dog(9, "Ghost")).is_none());
    }
}
