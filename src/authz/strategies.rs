//! Authorization strategy implementations

use super::types::{AccessType, AuthorizationConfig, AuthorizationScope, RequestContext};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Decides what a caller may touch
///
/// Implementations are read-only after construction and shared by all
/// concurrent requests.
pub trait AuthorizationStrategy: Send + Sync + Debug {
    /// Check whether the caller may perform `access` on the resource `resource_id`
    fn check_access(&self, ctx: &RequestContext, access: AccessType, resource_id: &str) -> bool {
        let _ = access;
        self.allowed_resources(ctx).permits(resource_id)
    }

    /// Enumerate the resources the caller may see
    fn allowed_resources(&self, ctx: &RequestContext) -> AuthorizationScope;
}

impl AuthorizationConfig {
    /// Build the configured strategy
    pub fn build(&self) -> Arc<dyn AuthorizationStrategy> {
        match self {
            AuthorizationConfig::AllowAll => Arc::new(AllowAll),
            AuthorizationConfig::Claims {
                allow_all_key,
                scope_key,
            } => Arc::new(ClaimsStrategy::new(allow_all_key, scope_key)),
        }
    }
}

// ============================================================================
// Allow All
// ============================================================================

/// Grants everything to everyone
///
/// Meant for single-tenant deployments and trusted administrative callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthorizationStrategy for AllowAll {
    fn check_access(&self, _ctx: &RequestContext, _access: AccessType, _resource_id: &str) -> bool {
        true
    }

    fn allowed_resources(&self, _ctx: &RequestContext) -> AuthorizationScope {
        AuthorizationScope::everything()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Derives access from two claims of the caller's token
///
/// - `allow_all_key`: a boolean claim; `true` grants unrestricted access.
/// - `scope_key`: an array claim of resource IDs.
///
/// Anything unexpected (no claims, missing or non-array scope claim) results
/// in an empty scope. Non-string array elements are skipped.
#[derive(Debug, Clone)]
pub struct ClaimsStrategy {
    allow_all_key: String,
    scope_key: String,
}

impl ClaimsStrategy {
    /// Create a new claims strategy
    pub fn new(allow_all_key: impl Into<String>, scope_key: impl Into<String>) -> Self {
        Self {
            allow_all_key: allow_all_key.into(),
            scope_key: scope_key.into(),
        }
    }

    /// Claim granting unrestricted access
    pub fn allow_all_key(&self) -> &str {
        &self.allow_all_key
    }

    /// Claim listing accessible IDs
    pub fn scope_key(&self) -> &str {
        &self.scope_key
    }
}

impl AuthorizationStrategy for ClaimsStrategy {
    fn allowed_resources(&self, ctx: &RequestContext) -> AuthorizationScope {
        let Some(claims) = ctx.claims() else {
            tracing::debug!("Retrieving allowed resources failed: no token in request context");
            return AuthorizationScope::nothing();
        };

        // Only a real boolean grants access; "true" as a string does not
        if let Some(Value::Bool(true)) = claims.get(&self.allow_all_key) {
            return AuthorizationScope::everything();
        }

        let Some(Value::Array(values)) = claims.get(&self.scope_key) else {
            tracing::debug!(
                key = %self.scope_key,
                "Retrieving allowed resources failed: claim is missing or not an array"
            );
            return AuthorizationScope::nothing();
        };

        let ids = values
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();

        AuthorizationScope::only(ids)
    }
}
