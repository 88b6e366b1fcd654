//! Server startup utilities.

use tasker_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
  ______           __
 /_  __/___ ______/ /_____  _____
  / / / __ `/ ___/ //_/ _ \/ ___/
 / / / /_/ (__  ) ,< /  __/ /
/_/  \__,_/____/_/|_|\___/_/

                async job engine
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let addr = config.server.addr();
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment: {}", config.app.environment);
    info!("REST API:    http://{}/jobs", addr);
    info!("Health:      http://{}/health", addr);
    info!("API Docs:    http://{}/api-docs/openapi.json", addr);
    info!(
        "Worker:      queue '{}', {} attempts, lock TTL {}s",
        config.jobs.worker.queue_name, config.jobs.retry.max_attempts, config.jobs.worker.lock_ttl_secs
    );
    info!("{}", separator);
}
