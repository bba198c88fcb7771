// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Clouditor Orchestrator
//!
//! Authorization-scoped, cursor-paginated access to cloud compliance data.
//!
//! ## Features
//!
//! - **Stateless pagination**: opaque page tokens carry the whole cursor
//! - **Fail-closed authorization**: callers only ever see resources in their scope
//! - **Pluggable sources**: the same paginator serves in-memory and stored data
//! - **Embedded storage**: DuckDB, in-memory or file backed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clouditor::pagination::{Paginator, SliceSource};
//!
//! let source = SliceSource::new(vec![1, 2, 3, 4, 5]);
//! let page = Paginator::default().paginate(2, "", &source).await?;
//! assert_eq!(page.items, vec![1, 2]);
//! assert_eq!(page.next_page_token, "CAIQAg==");
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   request ──► auth ──► RequestContext (claims, deadline)
//!                              │
//!                              ▼
//!   orchestrator ──► authz: allowed_resources / check_access
//!        │                     │ scope becomes a condition
//!        ▼                     ▼
//!   paginator ──► PageToken ──► StoreSource / SliceSource ──► DuckDB
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Page tokens, the paginator and page sources
pub mod pagination;

/// Authorization strategies and request context
pub mod authz;

/// Bearer token verification
pub mod auth;

/// DuckDB storage and the store adapter
pub mod database;

/// Targets of evaluation, certificates and catalogs
pub mod orchestrator;

/// Service configuration
pub mod config;

/// Command-line interface and HTTP API
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

// Re-export commonly used types
pub use authz::{AuthorizationStrategy, RequestContext};
pub use config::ServiceConfig;
pub use orchestrator::Orchestrator;
pub use pagination::{Page, PageToken, Paginator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
