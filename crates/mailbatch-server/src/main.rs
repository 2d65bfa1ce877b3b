//! Mailbatch - campaign service entry point

use anyhow::Result;
use mailbatch_common::config::{Config, LoggingConfig};
use mailbatch_core::{CampaignEngine, MaintenanceWorker, SenderManager};
use mailbatch_storage::db::DatabasePool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so logging can honor its format
    let config = Config::load()?;

    init_logging(&config.logging);

    info!("Starting Mailbatch server...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    // Initialize sender manager and campaign engine
    let sender = Arc::new(SenderManager::new(db_pool.clone()));
    let engine = Arc::new(CampaignEngine::new(db_pool.clone(), sender.clone()));

    // Fail campaigns stranded by a previous process before serving requests
    let maintenance = Arc::new(MaintenanceWorker::new(
        db_pool.clone(),
        sender.clone(),
        config.maintenance.reset_check_interval_secs,
    ));
    let recovered = maintenance.recover_interrupted().await?;
    if recovered > 0 {
        info!("Recovered {} interrupted campaign(s)", recovered);
    }

    // Start maintenance worker
    let maintenance_handle = {
        let maintenance = maintenance.clone();
        tokio::spawn(async move {
            maintenance.run().await;
        })
    };

    // Start API server
    let api_handle = {
        let app = mailbatch_api::create_router(db_pool.clone(), engine, sender, &config.api);
        let bind = format!("{}:{}", config.server.bind_address, config.api.port);
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .expect("Failed to bind API server");
            info!("Starting API server on {}", bind);
            // Connect info feeds the per-request origin IP used for quota auditing
            if let Err(e) = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("Mailbatch server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Cleanup
    api_handle.abort();
    maintenance_handle.abort();

    info!("Mailbatch server shutdown complete");

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},mailbatch=debug", logging.level)));

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true).with_level(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .init();
    }
}
