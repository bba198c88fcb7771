//! Store adapter for the paginator

use super::engine::DatabaseEngine;
use super::query::{Condition, OrderBy, Resource};
use crate::error::{Error, Result};
use crate::pagination::{Fetched, PageSource};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::time::Instant;

/// Fetches pages of a resource table with a fixed filter and order
///
/// The authorization filter must already be part of `conditions`.
pub struct StoreSource<R> {
    engine: Arc<DatabaseEngine>,
    order: OrderBy,
    conditions: Vec<Condition>,
    deadline: Option<Instant>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> StoreSource<R> {
    /// Create a new store source
    pub fn new(engine: Arc<DatabaseEngine>, order: OrderBy, conditions: Vec<Condition>) -> Self {
        Self {
            engine,
            order,
            conditions,
            deadline: None,
            _resource: PhantomData,
        }
    }

    /// Abandon fetches that do not finish before `deadline`
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

#[async_trait]
impl<R: Resource> PageSource<R> for StoreSource<R> {
    async fn fetch(&self, start: i64, size: i32) -> Result<Fetched<R>> {
        let engine = Arc::clone(&self.engine);
        let order = self.order.clone();
        let conditions = self.conditions.clone();
        let items = run_blocking(self.deadline, move || {
            engine.list::<R>(&order, start, i64::from(size), &conditions)
        })
        .await?;

        // The store returns a full page whenever one exists
        let exhausted = items.len() < usize::try_from(size).unwrap_or(0);

        tracing::trace!(
            table = R::TABLE,
            start,
            size,
            returned = items.len(),
            exhausted,
            "Fetched page"
        );

        Ok(Fetched { items, exhausted })
    }
}

/// Run blocking storage reads on the blocking pool, bounded by a deadline
///
/// An already expired deadline fails without starting the work. Once the
/// deadline passes the caller gets `DeadlineExceeded` while the work itself
/// runs on in the background, so only use this for reads.
pub async fn run_blocking<T, F>(deadline: Option<Instant>, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    check_deadline(deadline)?;

    let task = tokio::task::spawn_blocking(work);
    let joined = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, task)
            .await
            .map_err(|_| Error::DeadlineExceeded)?,
        None => task.await,
    };

    joined.map_err(join_error)?
}

/// Run blocking storage writes on the blocking pool
///
/// The deadline is only checked before the work starts. Once started, the
/// result is always awaited, so a committed write is never reported as
/// `DeadlineExceeded`.
pub async fn run_to_completion<T, F>(deadline: Option<Instant>, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    check_deadline(deadline)?;

    tokio::task::spawn_blocking(work).await.map_err(join_error)?
}

fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    if deadline.is_some_and(|d| d <= Instant::now()) {
        return Err(Error::DeadlineExceeded);
    }
    Ok(())
}

fn join_error(e: tokio::task::JoinError) -> Error {
    if e.is_cancelled() {
        Error::Cancelled
    } else {
        Error::store(format!("Query worker failed: {e}"))
    }
}
