//! Service configuration
//!
//! Loaded from a YAML file; every field has a default so an empty file (or
//! no file at all) yields a working single-tenant setup.

use crate::auth::AuthenticationConfig;
use crate::authz::AuthorizationConfig;
use crate::error::{Error, Result, ResultExt};
use crate::orchestrator::Catalog;
use crate::pagination::PaginationOpts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Storage settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Page size limits for every list operation
    #[serde(default)]
    pub pagination: PaginationOpts,

    /// Bearer token verification
    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// Which authorization strategy to use
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Create the default target of evaluation when none exists
    #[serde(default = "default_true")]
    pub create_default_target: bool,

    /// Catalogs served by the orchestrator
    #[serde(default)]
    pub catalogs: Vec<Catalog>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            pagination: PaginationOpts::default(),
            authentication: AuthenticationConfig::default(),
            authorization: AuthorizationConfig::default(),
            create_default_target: true,
            catalogs: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline for a single request, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// DuckDB file; in-memory when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// Loading
// ============================================================================

impl ServiceConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        Self::load_from_str(&content)
    }

    /// Parse and validate a YAML configuration
    pub fn load_from_str(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults"
        let config: ServiceConfig = if yaml.trim().is_empty() {
            ServiceConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let PaginationOpts {
            default_page_size,
            max_page_size,
        } = self.pagination;

        if default_page_size <= 0 || max_page_size <= 0 {
            return Err(Error::config("page sizes must be positive"));
        }
        if default_page_size > max_page_size {
            return Err(Error::config(format!(
                "default_page_size ({default_page_size}) exceeds max_page_size ({max_page_size})"
            )));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(Error::config("request_timeout_ms must be positive"));
        }

        self.authentication.validate()?;
        self.authorization.validate()?;

        if let Some(catalog) = self.catalogs.iter().find(|c| c.id.is_empty()) {
            return Err(Error::config(format!(
                "catalog '{}' has an empty id",
                catalog.name
            )));
        }

        if !self.authentication.enabled
            && matches!(self.authorization, AuthorizationConfig::Claims { .. })
        {
            tracing::warn!(
                "Claims authorization without authentication: callers have no claims and see nothing"
            );
        }

        Ok(())
    }
}
