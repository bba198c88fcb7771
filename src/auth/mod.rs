//! Authentication module
//!
//! Verifies JWT bearer tokens (HMAC, RSA or ECDSA signed) and produces the
//! [`crate::authz::RequestContext`] consumed by authorization. This is the only
//! place that ever looks at a raw token.

mod authenticator;
mod middleware;
mod types;

pub use authenticator::{bearer_token, Authenticator, TokenVerifier};
pub use middleware::authenticate;
pub use types::{AuthenticationConfig, JwtAlgorithm};
