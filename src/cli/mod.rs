//! CLI module for formwire
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP and websocket server
//! - summary: Print a form's answer counts from the data directory
//! - export: Write a form's CSV export from the data directory

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command, DEFAULT_CONFIG_PATH};
pub use commands::{export, init_tracing, open_state, run, run_command, serve, summary};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
