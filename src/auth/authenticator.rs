//! Authenticator implementation
//!
//! Verifies bearer tokens and turns them into a [`RequestContext`].

use super::types::AuthenticationConfig;
use crate::authz::{Claims, RequestContext};
use crate::error::{Error, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::time::Duration;

/// Verifies the signature and standard claims of a JWT
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier from the configuration
    pub fn new(config: &AuthenticationConfig) -> Result<Self> {
        config.validate()?;

        let key = if config.algorithm.is_hmac() {
            let secret = config.secret.as_deref().unwrap_or_default();
            DecodingKey::from_secret(secret.as_bytes())
        } else {
            let pem = config.public_key_pem.as_deref().unwrap_or_default();
            let parsed = if config.algorithm.is_ecdsa() {
                DecodingKey::from_ec_pem(pem.as_bytes())
            } else {
                DecodingKey::from_rsa_pem(pem.as_bytes())
            };
            parsed.map_err(|e| Error::config(format!("Invalid public key: {e}")))?
        };

        let mut validation = Validation::new(config.algorithm.into());
        let mut required = vec!["exp"];
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        match &config.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&required);

        Ok(Self { key, validation })
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                Error::Unauthenticated
            })
    }
}

/// Produces the per-request context from the `Authorization` header
pub struct Authenticator {
    verifier: Option<TokenVerifier>,
    request_timeout: Duration,
}

impl Authenticator {
    /// Create a new authenticator
    ///
    /// With authentication disabled no token is ever inspected and every
    /// request runs without claims.
    pub fn new(config: &AuthenticationConfig, request_timeout: Duration) -> Result<Self> {
        let verifier = if config.enabled {
            Some(TokenVerifier::new(config)?)
        } else {
            None
        };

        Ok(Self {
            verifier,
            request_timeout,
        })
    }

    /// An authenticator that lets everything through
    pub fn disabled(request_timeout: Duration) -> Self {
        Self {
            verifier: None,
            request_timeout,
        }
    }

    /// Check if tokens are required
    pub fn is_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Build the request context for an `Authorization` header value
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<RequestContext> {
        let ctx = match &self.verifier {
            None => RequestContext::anonymous(),
            Some(verifier) => {
                let token = authorization
                    .and_then(bearer_token)
                    .ok_or(Error::Unauthenticated)?;
                let claims = verifier.verify(token)?;
                tracing::trace!(subject = ?claims.subject(), "Authenticated request");
                RequestContext::with_claims(claims)
            }
        };

        Ok(ctx.with_timeout(self.request_timeout))
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
