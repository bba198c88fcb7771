//! Pagination module
//!
//! Stateless cursor pagination: every list call returns an opaque page token
//! that carries everything needed to continue the scan, so the server keeps
//! no per-client session.
//!
//! # Overview
//!
//! - [`PageToken`] encodes the cursor (offset and size).
//! - [`Paginator`] resolves the page size, decodes the token, invokes a
//!   [`PageSource`] and computes the next token.
//! - [`SliceSource`] paginates in-memory data; the store adapter lives in
//!   [`crate::database`].

mod paginator;
mod sources;
mod token;
mod types;

pub use paginator::Paginator;
pub use sources::{list_all, SliceSource};
pub use token::PageToken;
pub use types::{
    Fetched, ListRequest, Page, PageSource, PaginatedRequest, PaginatedResponse, PaginationOpts,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

#[cfg(test)]
mod tests;
