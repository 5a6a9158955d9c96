use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use trongate_api::auth::MySqlTokenStore;
use trongate_api::config;
use trongate_api::database::{DatabaseManager, MySqlDatabase};
use trongate_api::endpoints::DescriptorStore;
use trongate_api::hooks::HookRegistry;
use trongate_api::server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Trongate API in {:?} mode", config.environment);
    if config.security.bypass_token.is_some() {
        tracing::warn!("SECURITY_BYPASS_TOKEN is set: requests carrying it skip authorization rules");
    }

    let manager = DatabaseManager::connect(&config.database).await?;
    let db = Arc::new(
        MySqlDatabase::new(manager.pool().clone())
            .with_query_logging(config.database.enable_query_logging, config.database.slow_query_threshold_ms),
    );

    // Applications register their module/method hooks here before serving
    let hooks = HookRegistry::new();
    tracing::debug!("Registered hooks: {:?}", hooks.names());

    let state = AppState {
        db: db.clone(),
        tokens: Arc::new(MySqlTokenStore::new(db)),
        descriptors: DescriptorStore::new(&config.endpoints.modules_dir),
        hooks: Arc::new(hooks),
        config: Arc::new(config.clone()),
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        "Trongate API listening on http://{} (modules in {})",
        bind_addr,
        config.endpoints.modules_dir.display()
    );

    axum::serve(listener, app(state)).await?;
    manager.close().await;
    Ok(())
}
