use std::net::SocketAddr;
use std::sync::Arc;

use listings_backend::config::AppConfig;
use listings_backend::{build_router, db, store::pg::PgStore, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "Loaded config: port {}, property numbers {}{}",
        config.port,
        config.property_number_prefix,
        "0".repeat(config.property_number_width)
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let pool = db::establish_pool(&config.database_url, config.db_pool_size)
        .map_err(|e| format!("Failed to connect to database: {}", e))?;
    let test_query = db::probe(&pool)?;
    log::info!("Database test query result: {}", test_query);

    let state = AppState::new(config, Arc::new(PgStore::new(pool)));
    let app = build_router(state);

    log::info!("Starting server on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Received Ctrl+C, shutting down");
}
