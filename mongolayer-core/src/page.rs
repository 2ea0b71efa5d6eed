//! Result envelope for paginated reads.
//!
//! This module provides [`PaginatedList`], the value returned by the pagination executor.
//! It serializes as `{ "has_more": .., "total": .., "items": [..] }`.

use serde::{Deserialize, Serialize};

/// A single page of results produced by keyset pagination.
///
/// # Type Parameters
///
/// * `T` - The type of items contained in this page
///
/// # Example
///
/// ```ignore
/// use mongolayer::page::PaginatedList;
///
/// let page = PaginatedList::new(vec!["a", "b"], true, 10);
/// assert!(page.has_more);
/// assert_eq!(page.items.len(), 2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaginatedList<T> {
    /// Whether at least one more record follows the last item of this page.
    pub has_more: bool,
    /// Size of the whole result set. Zero when the count was skipped, in which case it
    /// means "unknown" rather than "empty".
    pub total: u64,
    /// The items of this page, in query order.
    pub items: Vec<T>,
}

impl<T> PaginatedList<T> {
    pub fn new(items: Vec<T>, has_more: bool, total: u64) -> Self {
        Self { has_more, total, items }
    }

    /// Maps items while preserving the pagination metadata.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> PaginatedList<U> {
        PaginatedList {
            has_more: self.has_more,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for PaginatedList<T> {
    fn default() -> Self {
        Self {
            has_more: false,
            total: 0,
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_snake_case_fields() {
        let page = PaginatedList::new(vec![1, 2], true, 5);

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({ "has_more": true, "total": 5, "items": [1, 2] })
        );
    }

    #[test]
    fn map_items_keeps_metadata() {
        let page = PaginatedList::new(vec![1, 2, 3], true, 9).map_items(|n| n * 10);

        assert_eq!(page.items, vec![10, 20, 30]);
        assert!(page.has_more);
        assert_eq!(page.total, 9);
    }
}
