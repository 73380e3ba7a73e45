/// Database connection and table bootstrap
pub mod database;

/// Application settings from config.toml and environment variables
pub mod settings;
