//! Boukir Service - HTTP API for credit notes and stock
//!
//! This is the main entry point for the boukir service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boukir_service::{create_router, AppState, ServiceConfig};
use boukir_store::{DocumentLedger, DocumentStore, MemoryDatabase, PgDatabase};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boukir=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Boukir Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        db_max_connections = config.db_max_connections,
        "Service configuration loaded"
    );

    let store: Arc<dyn DocumentStore> = if let Some(pg) = config.pg_config() {
        tracing::info!("Connecting to PostgreSQL");
        let db = PgDatabase::connect(&pg).await?;
        db.migrate().await?;
        Arc::new(DocumentLedger::new(db))
    } else {
        tracing::warn!("DATABASE_URL not set, using the in-memory store");
        Arc::new(DocumentLedger::new(MemoryDatabase::new()))
    };

    let state = AppState::new(store, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
