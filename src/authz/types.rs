//! Authorization types
//!
//! The request context and claim set are produced once per request by the
//! authentication layer; everything here is read-only afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Kind of operation a caller wants to perform on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Create => write!(f, "create"),
            AccessType::Read => write!(f, "read"),
            AccessType::Update => write!(f, "update"),
            AccessType::Delete => write!(f, "delete"),
        }
    }
}

/// Claims of an already verified bearer token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wrap a claim map
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Build claims from a JSON object
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::invalid_argument(format!(
                "claims must be a JSON object, got {other}"
            ))),
        }
    }

    /// Look up a single claim
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `sub` claim, if it is a string
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-request context handed to services
///
/// Carries the verified claims of the caller (if any) and the deadline after
/// which storage work should be abandoned.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    claims: Option<Arc<Claims>>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context without any credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context for a caller with the given claims
    pub fn with_claims(claims: Claims) -> Self {
        Self {
            claims: Some(Arc::new(claims)),
            deadline: None,
        }
    }

    /// Set an absolute deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Claims of the caller
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_deref()
    }

    /// Deadline of the request
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check if the deadline has already passed
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| d <= Instant::now())
    }
}

/// What a caller may see
///
/// `all` means no filtering at all. Otherwise only resources whose ID is in
/// `ids` are visible; an empty `ids` means nothing is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationScope {
    pub all: bool,
    pub ids: Vec<String>,
}

impl AuthorizationScope {
    /// Unrestricted scope
    pub fn everything() -> Self {
        Self {
            all: true,
            ids: Vec::new(),
        }
    }

    /// Scope limited to the given IDs
    pub fn only(ids: Vec<String>) -> Self {
        Self { all: false, ids }
    }

    /// Empty scope
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Check if a resource is inside this scope
    pub fn permits(&self, id: &str) -> bool {
        self.all || self.ids.iter().any(|allowed| allowed == id)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Default claim that grants access to everything
pub const DEFAULT_ALLOW_ALL_KEY: &str = "cladmin";

/// Default claim listing the target of evaluation IDs a caller may access
pub const DEFAULT_SCOPE_KEY: &str = "target_of_evaluation_ids";

/// Which authorization strategy the service uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AuthorizationConfig {
    /// Every caller may access everything
    #[default]
    AllowAll,

    /// Access is derived from token claims
    Claims {
        /// Boolean claim granting unrestricted access
        #[serde(default = "default_allow_all_key")]
        allow_all_key: String,
        /// Array claim listing accessible resource IDs
        #[serde(default = "default_scope_key")]
        scope_key: String,
    },
}

fn default_allow_all_key() -> String {
    DEFAULT_ALLOW_ALL_KEY.to_string()
}

fn default_scope_key() -> String {
    DEFAULT_SCOPE_KEY.to_string()
}

impl AuthorizationConfig {
    /// Create a claims-based configuration
    pub fn claims(allow_all_key: impl Into<String>, scope_key: impl Into<String>) -> Self {
        Self::Claims {
            allow_all_key: allow_all_key.into(),
            scope_key: scope_key.into(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AllowAll => Ok(()),
            Self::Claims {
                allow_all_key,
                scope_key,
            } => {
                if allow_all_key.is_empty() || scope_key.is_empty() {
                    return Err(Error::config("authorization claim keys must not be empty"));
                }
                if allow_all_key == scope_key {
                    return Err(Error::config(
                        "authorization allow_all_key and scope_key must differ",
                    ));
                }
                Ok(())
            }
        }
    }
}
