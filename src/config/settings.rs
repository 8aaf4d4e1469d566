//! Application settings loading from config.toml
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then a few
//! environment variable overrides (`DATABASE_URL`, `BIND_ADDRESS`, `GRAPH_MAX_DEPTH`).
//! The `.env` file is loaded by `main` before any of this runs.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable that points at an alternative config file
pub const CONFIG_PATH_VAR: &str = "IDIOT_INDEX_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Composition graph limits
    pub graph: GraphConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SeaORM connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: super::database::DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Composition graph limits
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    /// Deepest component chain a traversal will follow before failing
    pub max_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

impl AppConfig {
    /// Applies environment overrides using the given lookup function.
    ///
    /// The lookup is injected so tests do not have to mutate the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(address) = lookup("BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        if let Some(depth) = lookup("GRAPH_MAX_DEPTH") {
            self.graph.max_depth = depth.trim().parse().map_err(|e| Error::Config {
                message: format!("GRAPH_MAX_DEPTH must be a positive integer: {e}"),
            })?;
        }
        Ok(())
    }

    /// Checks values that serde cannot constrain on its own.
    pub fn validate(&self) -> Result<()> {
        if self.graph.max_depth == 0 {
            return Err(Error::Config {
                message: "graph.max_depth must be at least 1".to_string(),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(Error::Config {
                message: "database.url cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads the full application configuration.
///
/// Reads the file named by `IDIOT_INDEX_CONFIG` (default `./config.toml`). A missing
/// default file is not an error; a missing explicitly-named file is. Environment
/// overrides are applied last and the result is validated.
pub fn load_app_configuration() -> Result<AppConfig> {
    let explicit = std::env::var(CONFIG_PATH_VAR).ok();
    let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

    let mut config = if explicit.is_some() || Path::new(path).exists() {
        load_config(path)?
    } else {
        info!("No {} found, using default settings", DEFAULT_CONFIG_PATH);
        AppConfig::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
