//! Authorization module
//!
//! Decides which resources a caller may see or modify. Strategies never
//! parse tokens themselves; they read the claims the authentication layer
//! placed into the [`RequestContext`].

mod strategies;
mod types;

pub use strategies::{AllowAll, AuthorizationStrategy, ClaimsStrategy};
pub use types::{
    AccessType, AuthorizationConfig, AuthorizationScope, Claims, RequestContext,
    DEFAULT_ALLOW_ALL_KEY, DEFAULT_SCOPE_KEY,
};
