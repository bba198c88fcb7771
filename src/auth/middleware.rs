//! Axum middleware placing a [`RequestContext`] into request extensions

use super::authenticator::Authenticator;
use crate::error::Result;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Authenticate the request, then hand it to the next layer
///
/// Rejected requests never reach a handler.
pub async fn authenticate(
    State(authenticator): State<Arc<Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let ctx = authenticator.authenticate(header)?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
