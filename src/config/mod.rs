/// Database configuration and connection management
pub mod database;

/// Application settings loading from config.toml and environment variables
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
