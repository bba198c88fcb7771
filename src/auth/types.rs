//! Authentication configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// JWT Algorithm
// ============================================================================

/// JWT signature algorithm accepted by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSA using SHA-256
    RS256,
    /// RSA using SHA-384
    RS384,
    /// RSA using SHA-512
    RS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
}

impl JwtAlgorithm {
    /// Check if this algorithm uses a shared secret
    pub fn is_hmac(self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Check if this algorithm uses an elliptic curve key
    pub fn is_ecdsa(self) -> bool {
        matches!(self, Self::ES256 | Self::ES384)
    }
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
            JwtAlgorithm::RS256 => jsonwebtoken::Algorithm::RS256,
            JwtAlgorithm::RS384 => jsonwebtoken::Algorithm::RS384,
            JwtAlgorithm::RS512 => jsonwebtoken::Algorithm::RS512,
            JwtAlgorithm::ES256 => jsonwebtoken::Algorithm::ES256,
            JwtAlgorithm::ES384 => jsonwebtoken::Algorithm::ES384,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Bearer token verification settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// Require a valid bearer token on every API request
    #[serde(default)]
    pub enabled: bool,

    /// Expected signature algorithm
    #[serde(default)]
    pub algorithm: JwtAlgorithm,

    /// Shared secret (HS* algorithms)
    #[serde(default)]
    pub secret: Option<String>,

    /// PEM encoded public key (RS* and ES* algorithms)
    #[serde(default)]
    pub public_key_pem: Option<String>,

    /// Required `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,

    /// Required `aud` claim
    #[serde(default)]
    pub audience: Option<String>,
}

impl AuthenticationConfig {
    /// Enabled HMAC configuration with the given secret
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            enabled: true,
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.algorithm.is_hmac() {
            if self.secret.as_deref().map_or(true, str::is_empty) {
                return Err(Error::config(format!(
                    "authentication with {:?} requires a secret",
                    self.algorithm
                )));
            }
        } else if self.public_key_pem.as_deref().map_or(true, str::is_empty) {
            return Err(Error::config(format!(
                "authentication with {:?} requires public_key_pem",
                self.algorithm
            )));
        }

        Ok(())
    }
}
