//! Application settings loaded from `config.toml` with environment overrides.
//!
//! Every field has a default so the service starts with no config file at
//! all; `DATABASE_URL` and `LISTEN_ADDR` environment variables win over the
//! file when set.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database connection string
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Per-transaction amount ceiling enforced on every create and edit
    #[serde(default = "default_max_transaction_amount")]
    pub max_transaction_amount: Decimal,
}

fn default_database_url() -> String {
    "sqlite://data/cashbox_ledger.sqlite?mode=rwc".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_transaction_amount() -> Decimal {
    Decimal::from(250_000i64)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            listen_addr: default_listen_addr(),
            max_transaction_amount: default_max_transaction_amount(),
        }
    }
}

/// Loads settings from the given TOML file, then applies environment
/// overrides. A missing file is not an error; the defaults apply.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();

    let mut config = if path_ref.exists() {
        tracing::debug!("Loading configuration from {:?}", path_ref);
        let contents = fs::read_to_string(path_ref).map_err(|e| Error::Config {
            message: format!("Failed to read config file {path_ref:?}: {e}"),
        })?;
        toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse TOML from config file {path_ref:?}: {e}"),
        })?
    } else {
        tracing::info!("No config file at {:?}, using defaults", path_ref);
        AppConfig::default()
    };

    if let Ok(url) = env::var("DATABASE_URL") {
        config.database_url = url;
    }
    if let Ok(addr) = env::var("LISTEN_ADDR") {
        config.listen_addr = addr;
    }

    Ok(config)
}
