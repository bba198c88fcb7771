//! The paginator
//!
//! Turns a requested page size and page token into one call of a
//! [`PageSource`] and computes the token of the following page.

use super::token::PageToken;
use super::types::{Page, PageSource, PaginatedRequest, PaginationOpts};
use crate::error::{Error, Result};

/// Paginates any [`PageSource`] with a fixed set of size limits
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    opts: PaginationOpts,
}

impl Paginator {
    /// Create a paginator with the given size limits
    pub fn new(opts: PaginationOpts) -> Self {
        Self { opts }
    }

    /// Get the size limits
    pub fn opts(&self) -> &PaginationOpts {
        &self.opts
    }

    /// Resolve the page size to actually use for a request
    ///
    /// `0` selects the default; anything above the maximum is clamped.
    pub fn effective_page_size(&self, requested: i32) -> Result<i32> {
        match requested {
            0 => Ok(self.opts.default_page_size),
            n if n < 0 => Err(Error::invalid_argument(format!(
                "page size must not be negative, got {n}"
            ))),
            n if n > self.opts.max_page_size => Ok(self.opts.max_page_size),
            n => Ok(n),
        }
    }

    /// Fetch one page from `source`
    ///
    /// Token decoding happens before the source is touched, so a malformed
    /// token never causes any I/O. Errors from the source, including
    /// cancellation, are returned unchanged.
    pub async fn paginate<T, S>(&self, page_size: i32, page_token: &str, source: &S) -> Result<Page<T>>
    where
        S: PageSource<T> + ?Sized,
    {
        let size = self.effective_page_size(page_size)?;

        // The size carried in the token is informational; the caller's
        // requested size always wins.
        let start = if page_token.is_empty() {
            0
        } else {
            PageToken::decode(page_token)?.start
        };

        let fetched = source.fetch(start, size).await?;

        if fetched.exhausted || fetched.items.is_empty() {
            tracing::trace!(start, size, count = fetched.items.len(), "last page");
            return Ok(Page {
                items: fetched.items,
                next_page_token: String::new(),
            });
        }

        // Anchor on what was actually returned: a filtered source may hand
        // back fewer than `size` items without being exhausted.
        let next_start = start
            .checked_add(fetched.items.len() as i64)
            .ok_or_else(|| Error::malformed_token("start offset overflow"))?;

        tracing::trace!(start, size, next_start, "next page available");

        Ok(Page {
            items: fetched.items,
            next_page_token: PageToken::new(next_start, size).encode(),
        })
    }

    /// Fetch the page described by a list request
    pub async fn paginate_request<T, S, R>(&self, req: &R, source: &S) -> Result<Page<T>>
    where
        S: PageSource<T> + ?Sized,
        R: PaginatedRequest + ?Sized,
    {
        self.paginate(req.page_size(), req.page_token(), source)
            .await
    }
}
