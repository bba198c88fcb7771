//! Pagination types and traits
//!
//! Defines the core pagination abstractions shared by every data source.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default page size used when a request does not specify one
pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Largest page size a request may ask for
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Tuning knobs for page sizes
///
/// Lower these for resources whose items are very large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOpts {
    /// Page size used if the request does not specify one
    #[serde(default = "default_page_size")]
    pub default_page_size: i32,

    /// Maximum page size that can be requested
    #[serde(default = "max_page_size")]
    pub max_page_size: i32,
}

fn default_page_size() -> i32 {
    DEFAULT_PAGE_SIZE
}

fn max_page_size() -> i32 {
    MAX_PAGE_SIZE
}

impl Default for PaginationOpts {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PaginationOpts {
    /// Create pagination options
    pub fn new(default_page_size: i32, max_page_size: i32) -> Self {
        Self {
            default_page_size,
            max_page_size,
        }
    }
}

/// One fetch from a [`PageSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// Items of this page, in result order
    pub items: Vec<T>,
    /// No further items exist after this page
    pub exhausted: bool,
}

impl<T> Fetched<T> {
    /// A page with more data behind it
    pub fn more(items: Vec<T>) -> Self {
        Self {
            items,
            exhausted: false,
        }
    }

    /// The final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            exhausted: true,
        }
    }
}

/// A page of results together with the token for the next one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Empty when there are no further pages
    pub next_page_token: String,
}

impl<T> Page<T> {
    /// Check if this is the last page
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_empty()
    }

    /// Transform the items of this page, keeping the token
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }
}

/// The pluggable fetch callback of the paginator
///
/// Implementations are the only place that knows about the underlying data
/// (memory or storage) and any authorization filter, which must already be
/// part of the source when it is handed to the paginator.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch up to `size` items starting at offset `start`
    async fn fetch(&self, start: i64, size: i32) -> Result<Fetched<T>>;
}

/// Parameters of a paginated list request
pub trait PaginatedRequest {
    fn page_size(&self) -> i32;
    fn page_token(&self) -> &str;
    fn order_by(&self) -> &str;
    fn asc(&self) -> bool;
}

/// A paginated list response
pub trait PaginatedResponse {
    fn next_page_token(&self) -> &str;
}

impl<T> PaginatedResponse for Page<T> {
    fn next_page_token(&self) -> &str {
        &self.next_page_token
    }
}

/// Generic list request, as received from query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: String,
    #[serde(default)]
    pub order_by: String,
    #[serde(default = "default_asc")]
    pub asc: bool,
}

fn default_asc() -> bool {
    true
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            page_size: 0,
            page_token: String::new(),
            order_by: String::new(),
            asc: true,
        }
    }
}

impl ListRequest {
    /// Request a page of the given size
    pub fn with_page_size(page_size: i32) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Continue from a token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = token.into();
        self
    }

    /// Order by a column
    #[must_use]
    pub fn with_order(mut self, column: impl Into<String>, asc: bool) -> Self {
        self.order_by = column.into();
        self.asc = asc;
        self
    }
}

impl PaginatedRequest for ListRequest {
    fn page_size(&self) -> i32 {
        self.page_size
    }

    fn page_token(&self) -> &str {
        &self.page_token
    }

    fn order_by(&self) -> &str {
        &self.order_by
    }

    fn asc(&self) -> bool {
        self.asc
    }
}
