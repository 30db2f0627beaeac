//! Waitline - Main Entry Point
//! JSON-RPC server over a SQLite-backed queue store

mod config;
mod telemetry;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::DaemonConfig;
use waitline_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use waitline_core::application::{QueueService, TransactionPolicy};
use waitline_core::domain::QueueId;
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::QueuePorts;
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::load()?;

    // 2. Initialize logging
    init_logging(&config.log_format)?;
    info!("Waitline v{} starting...", VERSION);

    // 3. Initialize database
    info!(db_path = %config.db_path, "Initializing database...");
    if let Some(parent) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = create_pool(&config.db_path).await?;
    run_migrations(&pool).await?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteQueueStore::new(pool, time_provider.clone()));
    let policy = TransactionPolicy::default().with_max_attempts(config.max_transaction_attempts);
    let service = Arc::new(QueueService::new(
        QueuePorts::from_store(store),
        Arc::new(UuidProvider),
        time_provider,
        policy,
    ));

    // 5. Pre-initialize the default queue
    let default_queue = QueueId::parse(config.default_queue.as_str())?;
    service.ensure_queue(&default_queue).await?;

    // 6. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let rpc_server = RpcServer::new(rpc_config, RpcHandler::new(service, default_queue));
    let (addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}

/// Structured logging: `RUST_LOG` filter, pretty (dev) or JSON (production)
fn init_logging(log_format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("waitline=info"))?;
    let otel = telemetry::layer::<Registry>()?;

    match log_format {
        "json" => tracing_subscriber::registry()
            .with(otel)
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(otel)
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }

    Ok(())
}
