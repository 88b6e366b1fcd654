//! Application wiring: HTTP API and job worker sharing one store.

use anyhow::{bail, Context};
use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tasker_config::AppConfig;
use tasker_jobs::{JobExecutor, JobService, JobServiceInterface, SharedStore, SimulatedExecutor, Worker};
use tasker_rest::{create_router, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};

/// The assembled server.
pub struct App {
    config: AppConfig,
    router: Router,
    worker: Worker,
}

impl App {
    /// Builds the application with the simulated executor from configuration.
    pub fn new(config: AppConfig, store: Arc<dyn SharedStore>) -> Self {
        let executor = Arc::new(SimulatedExecutor::from(&config.jobs.executor));
        Self::with_executor(config, store, executor)
    }

    /// Builds the application around a custom executor.
    pub fn with_executor(
        config: AppConfig,
        store: Arc<dyn SharedStore>,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        let job_service: Arc<dyn JobServiceInterface> =
            Arc::new(JobService::from_config(store.clone(), &config.jobs));
        let router = create_router(AppState::new(job_service), &config.server);
        let worker = Worker::from_config(store, executor, &config.jobs);

        Self {
            config,
            router,
            worker,
        }
    }

    /// The HTTP router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The job worker.
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Serve HTTP on `listener` and run the worker until `shutdown` resolves.
    ///
    /// On shutdown the server drains, then the worker is stopped and awaited
    /// for at most the configured shutdown timeout. If the worker loop exits
    /// on its own (store failure) the server is dropped and the error
    /// returned.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown_timeout = self.config.jobs.worker.shutdown_timeout();
        let mut worker = self.worker.spawn();

        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .into_future();
        tokio::pin!(server);

        let exit = tokio::select! {
            served = &mut server => Exit::Server(served),
            stopped = worker.join() => Exit::Worker(stopped),
        };

        match exit {
            Exit::Server(served) => {
                info!("HTTP server stopped, stopping worker...");
                let stopped = worker.shutdown(shutdown_timeout).await;
                served.context("HTTP server error")?;
                stopped.context("Worker shutdown failed")?;
            }
            Exit::Worker(stopped) => {
                error!("Worker loop exited, shutting down");
                stopped.context("Worker loop failed")?;
                bail!("Worker loop exited unexpectedly");
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

enum Exit {
    Server(std::io::Result<()>),
    Worker(tasker_jobs::JobResult<()>),
}
