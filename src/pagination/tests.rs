//! Tests for pagination module

use super::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_case::test_case;

// ============================================================================
// PageToken Tests
// ============================================================================

#[test_case(2, 2, "CAIQAg==" ; "third item")]
#[test_case(4, 2, "CAQQAg==" ; "fifth item")]
#[test_case(0, 2, "EAI=" ; "zero start is omitted")]
#[test_case(5, 50, "CAUQMg==" ; "default page size")]
fn test_page_token_encode(start: i64, size: i32, expected: &str) {
    assert_eq!(PageToken::new(start, size).encode(), expected);
}

#[test]
fn test_page_token_encode_is_stable() {
    let token = PageToken::new(1234, 50);
    assert_eq!(token.encode(), token.encode());
}

#[test_case(0, 1)]
#[test_case(2, 2)]
#[test_case(127, 128)]
#[test_case(7936, 50)]
#[test_case(i64::MAX, i32::MAX)]
fn test_page_token_round_trip(start: i64, size: i32) {
    let decoded = PageToken::decode(&PageToken::new(start, size).encode()).unwrap();
    assert_eq!(decoded, PageToken::new(start, size));
}

#[test]
fn test_page_token_decode_example() {
    let token = PageToken::decode("CAIQAg==").unwrap();
    assert_eq!(token.start, 2);
    assert_eq!(token.size, 2);
}

#[test]
fn test_page_token_decode_url_safe_alphabet() {
    assert_eq!(PageToken::new(7936, 50).encode(), "CIA+EDI=");
    assert_eq!(
        PageToken::decode("CIA-EDI=").unwrap(),
        PageToken::new(7936, 50)
    );
}

#[test_case("" ; "empty string")]
#[test_case("not-base64!!" ; "invalid base64")]
#[test_case("CA==" ; "truncated varint")]
#[test_case("GAE=" ; "unknown field")]
#[test_case("CgEA" ; "length delimited field")]
#[test_case("CAI=" ; "missing size")]
#[test_case("CP///////////wEQAg==" ; "negative start")]
fn test_page_token_decode_rejects(token: &str) {
    let err = PageToken::decode(token).unwrap_err();
    assert!(
        matches!(err, Error::MalformedPageToken { .. }),
        "unexpected error: {err:?}"
    );
}

#[test]
fn test_page_token_rejects_negative_size() {
    let encoded = PageToken::new(3, -5).encode();
    assert!(PageToken::decode(&encoded).is_err());
}

// ============================================================================
// Test Sources
// ============================================================================

/// Counts fetches and delegates to a slice
struct CountingSource {
    inner: SliceSource<i32>,
    calls: AtomicUsize,
}

impl CountingSource {
    fn new(items: Vec<i32>) -> Self {
        Self {
            inner: SliceSource::new(items),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageSource<i32> for CountingSource {
    async fn fetch(&self, start: i64, size: i32) -> Result<Fetched<i32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(start, size).await
    }
}

/// Returns only even numbers out of each window, like a filtered store
struct SparseSource {
    items: Vec<i32>,
}

#[async_trait]
impl PageSource<i32> for SparseSource {
    async fn fetch(&self, start: i64, size: i32) -> Result<Fetched<i32>> {
        let start = start as usize;
        let end = (start + size as usize).min(self.items.len());
        let window: Vec<i32> = self.items[start.min(end)..end]
            .iter()
            .copied()
            .filter(|n| n % 2 == 0)
            .collect();
        Ok(Fetched {
            items: window,
            exhausted: end >= self.items.len(),
        })
    }
}

struct FailingSource;

#[async_trait]
impl PageSource<i32> for FailingSource {
    async fn fetch(&self, _start: i64, _size: i32) -> Result<Fetched<i32>> {
        Err(Error::Cancelled)
    }
}

// ============================================================================
// Paginator Tests
// ============================================================================

#[test_case("", vec![1, 2], "CAIQAg==" ; "first page")]
#[test_case("CAIQAg==", vec![3, 4], "CAQQAg==" ; "next page")]
#[test_case("CAQQAg==", vec![5], "" ; "last page")]
#[tokio::test]
async fn test_paginate_slice(token: &str, want_page: Vec<i32>, want_token: &str) {
    let source = SliceSource::new(vec![1, 2, 3, 4, 5]);
    let page = Paginator::default().paginate(2, token, &source).await.unwrap();

    assert_eq!(page.items, want_page);
    assert_eq!(page.next_page_token, want_token);
}

#[tokio::test]
async fn test_paginate_default_page_size() {
    let source = SliceSource::new((0..120).collect::<Vec<i32>>());
    let paginator = Paginator::new(PaginationOpts::new(50, 1000));

    let page = paginator.paginate(0, "", &source).await.unwrap();
    assert_eq!(page.items.len(), 50);

    let token = PageToken::decode(&page.next_page_token).unwrap();
    assert_eq!(token, PageToken::new(50, 50));
}

#[tokio::test]
async fn test_paginate_clamps_to_max_page_size() {
    let source = SliceSource::new((0..10).collect::<Vec<i32>>());
    let paginator = Paginator::new(PaginationOpts::new(2, 3));

    let page = paginator.paginate(100, "", &source).await.unwrap();
    assert_eq!(page.items, vec![0, 1, 2]);
    assert_eq!(
        PageToken::decode(&page.next_page_token).unwrap(),
        PageToken::new(3, 3)
    );
}

#[tokio::test]
async fn test_paginate_rejects_negative_page_size() {
    let source = CountingSource::new(vec![1, 2, 3]);
    let err = Paginator::default()
        .paginate(-1, "", &source)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_paginate_malformed_token_skips_fetch() {
    let source = CountingSource::new(vec![1, 2, 3]);
    let err = Paginator::default()
        .paginate(2, "not-base64!!", &source)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedPageToken { .. }));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_paginate_requested_size_beats_token_size() {
    let source = SliceSource::new(vec![1, 2, 3, 4, 5, 6, 7, 8]);
    let token = PageToken::new(2, 2).encode();

    let page = Paginator::default().paginate(4, &token, &source).await.unwrap();
    assert_eq!(page.items, vec![3, 4, 5, 6]);
    assert_eq!(
        PageToken::decode(&page.next_page_token).unwrap(),
        PageToken::new(6, 4)
    );
}

#[tokio::test]
async fn test_paginate_sparse_source_anchors_on_returned_items() {
    let source = SparseSource {
        items: (1..=10).collect(),
    };

    // Window [1, 2, 3, 4] keeps only [2, 4]
    let page = Paginator::default().paginate(4, "", &source).await.unwrap();
    assert_eq!(page.items, vec![2, 4]);
    assert_eq!(
        PageToken::decode(&page.next_page_token).unwrap(),
        PageToken::new(2, 4)
    );
}

#[tokio::test]
async fn test_paginate_empty_source() {
    let source = SliceSource::<i32>::new(vec![]);
    let page = Paginator::default().paginate(10, "", &source).await.unwrap();

    assert!(page.items.is_empty());
    assert!(page.is_last());
}

#[tokio::test]
async fn test_paginate_token_past_end() {
    let source = SliceSource::new(vec![1, 2, 3]);
    let token = PageToken::new(10, 2).encode();

    let page = Paginator::default().paginate(2, &token, &source).await.unwrap();
    assert!(page.items.is_empty());
    assert!(page.is_last());
}

#[tokio::test]
async fn test_paginate_propagates_source_errors() {
    let err = Paginator::default()
        .paginate(2, "", &FailingSource)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_paginate_request() {
    let source = SliceSource::new(vec![1, 2, 3, 4, 5]);
    let req = ListRequest::with_page_size(2).with_token("CAIQAg==");

    let page = Paginator::default()
        .paginate_request(&req, &source)
        .await
        .unwrap();
    assert_eq!(page.items, vec![3, 4]);
    assert_eq!(page.next_page_token(), "CAQQAg==");
}

// ============================================================================
// Completeness Tests
// ============================================================================

#[test_case(23, 4)]
#[test_case(20, 5)]
#[test_case(1, 1)]
#[test_case(0, 3)]
#[tokio::test]
async fn test_list_all_yields_every_item_once(count: i32, page_size: i32) {
    let values: Vec<i32> = (0..count).collect();
    let source = SliceSource::new(values.clone());
    let source = &source;
    let paginator = Paginator::default();

    let all = list_all(move |token: String| async move {
        paginator.paginate(page_size, &token, source).await
    })
    .await
    .unwrap();

    assert_eq!(all, values);
}

#[tokio::test]
async fn test_list_all_returns_errors_unchanged() {
    let result: Result<Vec<i32>> =
        list_all(|_token| async { Err(Error::PermissionDenied) }).await;
    assert!(matches!(result, Err(Error::PermissionDenied)));
}

// ============================================================================
// SliceSource Tests
// ============================================================================

#[tokio::test]
async fn test_slice_source_exhausted_flag() {
    let source = SliceSource::new(vec![1, 2, 3, 4]);

    let fetched = source.fetch(0, 2).await.unwrap();
    assert_eq!(fetched, Fetched::more(vec![1, 2]));

    let fetched = source.fetch(2, 2).await.unwrap();
    assert_eq!(fetched, Fetched::last(vec![3, 4]));
}

#[tokio::test]
async fn test_slice_source_from_map_values_is_sorted() {
    let mut map = HashMap::new();
    map.insert("c", 3);
    map.insert("a", 1);
    map.insert("b", 2);
    map.insert("d", 4);

    let source = SliceSource::from_map_values(&map, i32::cmp);
    assert_eq!(source.len(), 4);

    let page = Paginator::default().paginate(3, "", &source).await.unwrap();
    assert_eq!(page.items, vec![1, 2, 3]);
}
