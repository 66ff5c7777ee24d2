use address_book_api::{app, config, database::DatabaseManager, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.api.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Address Book API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is not set; token and session login will fail");
    }

    let db = DatabaseManager::connect(&config.database).await?;
    db.migrate().await?;

    let state = AppState::new(db.clone());
    match state.sessions.purge_expired().await {
        Ok(purged) if purged > 0 => tracing::info!("Purged {} expired sessions", purged),
        Ok(_) => {}
        Err(e) => tracing::warn!("Session purge failed: {}", e),
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Address Book API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;

    db.close().await;
    Ok(())
}
