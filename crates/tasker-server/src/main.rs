//! # Tasker Server
//!
//! Main entry point: loads configuration, connects to Redis, then serves the
//! REST API and runs the job worker until SIGINT/SIGTERM.

use anyhow::Context;
use std::sync::Arc;
use tasker_config::{AppConfig, ConfigLoader, LoggingConfig};
use tasker_jobs::{create_pool, register_metrics, RedisStore};
use tasker_server::{
    app::App,
    logging::init_logging,
    startup::{print_banner, print_startup_info},
};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            let _ = init_logging(&LoggingConfig::default());
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    print_banner();
    info!("Starting Tasker Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    register_metrics();

    let pool = create_pool(&config.jobs.redis)
        .await
        .context("Failed to connect to Redis")?;
    let store = Arc::new(RedisStore::new(pool));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    print_startup_info(&config);

    App::new(config, store)
        .serve(listener, shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
