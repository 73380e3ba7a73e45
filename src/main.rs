use cashbox_ledger::{
    api::{self, AppState},
    config::{database, settings},
    core::ledger::BoxLocks,
    errors::Result,
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 3. Load the application configuration
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = settings::load_settings(&config_path)?;
    info!("Configuration loaded");

    // 4. Initialize the database
    let db = database::create_connection(&config.database_url).await?;
    database::create_tables(&db).await?;
    info!("Database initialized");

    // 5. Serve the API
    let listen_addr = config.listen_addr.clone();
    let state = AppState {
        db,
        config: Arc::new(config),
        locks: Arc::new(BoxLocks::default()),
    };

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
