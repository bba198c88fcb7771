//! Storage via DuckDB
//!
//! This module provides the resource storage engine and the store adapter
//! that lets the paginator read bounded, ordered, filtered windows of a table.

mod engine;
mod query;
mod source;

pub use engine::DatabaseEngine;
pub use query::{Condition, OrderBy, Resource};
pub use source::{run_blocking, run_to_completion, StoreSource};
