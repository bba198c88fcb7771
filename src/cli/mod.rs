//! CLI module
//!
//! Command-line interface and HTTP API of the orchestrator.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP API server
//! - `validate` - Check a configuration file

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands};
pub use runner::Runner;
pub use server::{build_app, build_router, serve, status_code, ApiResponse};
