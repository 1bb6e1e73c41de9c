//! Configuration file
//!
//! JSON document read from `--config`. A missing file means all defaults.
//! `FORMWIRE_HOST`, `FORMWIRE_PORT` and `FORMWIRE_DATA_DIR` override the
//! file after it is loaded.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use super::errors::{CliError, CliResult};
use crate::http_server::HttpServerConfig;

pub const ENV_HOST: &str = "FORMWIRE_HOST";
pub const ENV_PORT: &str = "FORMWIRE_PORT";
pub const ENV_DATA_DIR: &str = "FORMWIRE_DATA_DIR";

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub server: HttpServerConfig,

    /// Durable storage directory; in-memory storage when absent
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is unset (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            data_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load(path: &Path) -> CliResult<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> CliResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(CliError::config_error(format!(
                    "Failed to read config {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CliResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| CliError::config_error(format!("Invalid {}: '{}'", ENV_PORT, port)))?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.server.port == 0 {
            return Err(CliError::config_error("port must be > 0"));
        }
        if self.server.host.trim().is_empty() {
            return Err(CliError::config_error("host must not be empty"));
        }
        Level::from_str(&self.log_level).map_err(|_| {
            CliError::config_error(format!("Invalid log_level: '{}'", self.log_level))
        })?;
        Ok(())
    }
}
