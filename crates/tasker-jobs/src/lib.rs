//! Tasker Jobs - Asynchronous Job Engine
//!
//! A Redis-backed job engine with:
//! - FIFO job queue over a shared key-value/list store
//! - Per-job locks with expiry, so one worker attempts a job at a time
//! - Retry policies with exponential backoff
//! - An append-only event log per job, mirrored to `tracing`
//! - A pluggable executor for the unit of work
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Tasker Jobs Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Client ──► JobService ──► job:{id} (JobStore)                   │
//! │                 │                                                │
//! │                 ▼                                                │
//! │            job_queue (JobQueue) ──► Worker                       │
//! │                                       │                          │
//! │                 ┌─────────────────────┼─────────────────────┐    │
//! │                 ▼                     ▼                     ▼    │
//! │          lock:job:{id}         JobExecutor          event_log:{id}
//! │          (LockManager)      + RetryPolicy            (EventLog)  │
//! │                                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tasker_jobs::prelude::*;
//! use tasker_jobs::{InMemoryStore, SimulatedExecutor};
//!
//! let store: Arc<dyn SharedStore> = Arc::new(InMemoryStore::new());
//! let config = JobsConfig::default();
//!
//! let service = JobService::from_config(store.clone(), &config);
//! let job = service.create_job(json!({"task": "hello"})).await?;
//!
//! let executor = Arc::new(SimulatedExecutor::from(&config.executor));
//! let handle = Worker::from_config(store, executor, &config).spawn();
//! // ...
//! handle.shutdown(config.worker.shutdown_timeout()).await?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod job;
pub mod job_store;
pub mod lock;
pub mod memory;
pub mod metrics;
pub mod queue;
pub mod redis;
pub mod retry;
pub mod service;
pub mod store;
pub mod worker;

pub use config::{ExecutorConfig, JobsConfig, RedisConfig, RetryConfig, WorkerConfig};
pub use error::{JobError, JobResult};
pub use events::{event_types, Event, EventLog};
pub use executor::{ExecutionFailure, ExecutionResult, JobContext, JobExecutor, SimulatedExecutor};
pub use job::{Job, JobId, JobStatus};
pub use job_store::JobStore;
pub use lock::{LockManager, DEFAULT_LOCK_TTL};
pub use memory::InMemoryStore;
pub use metrics::{register_metrics, JobMetrics, SkipReason};
pub use queue::JobQueue;
pub use redis::{create_pool, RedisKeys, RedisStore};
pub use retry::{RetryDecision, RetryPolicy};
pub use service::{JobService, JobServiceInterface};
pub use store::SharedStore;
pub use worker::{JobOutcome, Worker, WorkerHandle, NULL_RESULT_MESSAGE};

/// Re-export commonly used traits
pub mod prelude {
    pub use crate::executor::{ExecutionFailure, JobExecutor};
    pub use crate::job::{Job, JobStatus};
    pub use crate::retry::RetryPolicy;
    pub use crate::service::{JobService, JobServiceInterface};
    pub use crate::store::SharedStore;
    pub use crate::worker::Worker;
    pub use crate::{JobContext, JobError, JobId, JobResult, JobsConfig};
}
