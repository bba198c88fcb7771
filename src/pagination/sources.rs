//! In-memory page sources and client-side helpers

use super::types::{Fetched, Page, PageSource};
use crate::error::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

// ============================================================================
// Slice Source
// ============================================================================

/// Paginates a fully materialized sequence
///
/// The sequence must already be filtered to what the caller may see and be
/// in its final order.
#[derive(Debug, Clone)]
pub struct SliceSource<T> {
    items: Vec<T>,
}

impl<T> SliceSource<T> {
    /// Create a source over the given items
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Number of items in the source
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the source has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> SliceSource<T> {
    /// Create a source over the values of a map
    ///
    /// Map iteration order is unspecified, so the values are sorted with
    /// `cmp` to keep pages deterministic across calls.
    pub fn from_map_values<K, F>(map: &HashMap<K, T>, cmp: F) -> Self
    where
        K: Eq + Hash,
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut items: Vec<T> = map.values().cloned().collect();
        items.sort_by(cmp);
        Self { items }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> PageSource<T> for SliceSource<T> {
    async fn fetch(&self, start: i64, size: i32) -> Result<Fetched<T>> {
        let len = self.items.len();
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(size.max(0) as usize).min(len);

        Ok(Fetched {
            items: self.items[start..end].to_vec(),
            exhausted: end >= len,
        })
    }
}

// ============================================================================
// List All
// ============================================================================

/// Fetch every page of a paginated list call
///
/// `list` is called with an empty token first and then with each returned
/// `next_page_token` until it comes back empty. Errors from `list` are
/// returned as they are.
pub async fn list_all<T, F, Fut>(mut list: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut results = Vec::new();
    let mut page_token = String::new();

    loop {
        let page = list(page_token).await?;
        results.extend(page.items);

        if page.next_page_token.is_empty() {
            break;
        }
        page_token = page.next_page_token;
    }

    Ok(results)
}
