//! CLI runner - executes commands

use crate::authz::AuthorizationConfig;
use crate::cli::commands::{Cli, Commands};
use crate::cli::server;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use serde_json::json;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Serve { port } => self.serve(*port).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the config file, or fall back to defaults
    fn load_config(&self) -> Result<ServiceConfig> {
        match &self.cli.config {
            Some(path) => {
                if self.cli.verbose {
                    tracing::info!("Loading configuration from {}", path.display());
                }
                ServiceConfig::load(path)
            }
            None => {
                tracing::info!("No configuration file given, using defaults");
                Ok(ServiceConfig::default())
            }
        }
    }

    async fn serve(&self, port: Option<u16>) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(port) = port {
            config.server.port = port;
        }

        server::serve(&config).await
    }

    /// Validate the configuration file and print a summary
    fn validate(&self) -> Result<()> {
        if self.cli.config.is_none() {
            return Err(Error::config("no configuration file given (use --config)"));
        }
        let config = self.load_config()?;

        let strategy = match &config.authorization {
            AuthorizationConfig::AllowAll => "allow_all",
            AuthorizationConfig::Claims { .. } => "claims",
        };

        let summary = json!({
            "type": "VALIDATION",
            "valid": true,
            "port": config.server.port,
            "database": config
                .database
                .path
                .as_ref()
                .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string()),
            "authentication": config.authentication.enabled,
            "authorization": strategy,
            "default_page_size": config.pagination.default_page_size,
            "max_page_size": config.pagination.max_page_size,
            "catalogs": config.catalogs.len(),
        });
        println!("{summary}");

        Ok(())
    }
}
