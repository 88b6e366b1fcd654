//! Job service: submission and read-side access for adapters.

use crate::config::JobsConfig;
use crate::error::JobResult;
use crate::events::{event_types, Event, EventLog};
use crate::job::{Job, JobId};
use crate::job_store::JobStore;
use crate::metrics::JobMetrics;
use crate::queue::JobQueue;
use crate::redis::RedisKeys;
use crate::store::SharedStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Interface for job submission and status lookup.
///
/// This is the boundary the HTTP adapter depends on.
#[async_trait]
pub trait JobServiceInterface: Send + Sync {
    /// Create a job and queue it for execution.
    async fn create_job(&self, input_data: Value) -> JobResult<Job>;

    /// Get a job by ID.
    async fn get_job(&self, job_id: &JobId) -> JobResult<Job>;

    /// Get the event history of a job, oldest first.
    async fn get_events(&self, job_id: &JobId) -> JobResult<Vec<Event>>;
}

/// Job service implementation over a shared store.
#[derive(Clone)]
pub struct JobService {
    jobs: JobStore,
    queue: JobQueue,
    events: EventLog,
    queue_name: String,
}

impl JobService {
    /// Create a new job service that submits to `queue_name`.
    pub fn new(store: Arc<dyn SharedStore>, keys: RedisKeys, queue_name: impl Into<String>) -> Self {
        Self {
            jobs: JobStore::new(store.clone(), keys.clone()),
            queue: JobQueue::new(store.clone(), keys.clone()),
            events: EventLog::new(store, keys),
            queue_name: queue_name.into(),
        }
    }

    /// Create a job service from the engine configuration.
    pub fn from_config(store: Arc<dyn SharedStore>, config: &JobsConfig) -> Self {
        Self::new(
            store,
            RedisKeys::new(config.redis.key_prefix.clone()),
            config.worker.queue_name.clone(),
        )
    }
}

#[async_trait]
impl JobServiceInterface for JobService {
    async fn create_job(&self, input_data: Value) -> JobResult<Job> {
        let job = Job::queued(JobId::new(), input_data);

        // The record must exist before a worker can dequeue the ID.
        self.jobs.insert(&job).await?;
        self.queue.enqueue(&self.queue_name, &job.id).await?;

        self.events
            .emit(
                event_types::JOB_CREATED,
                json!({"job_id": job.id, "queue": self.queue_name}),
            )
            .await?;
        JobMetrics::job_created(&self.queue_name);

        info!(job_id = %job.id, queue = %self.queue_name, "Job created");
        Ok(job)
    }

    async fn get_job(&self, job_id: &JobId) -> JobResult<Job> {
        self.jobs.get(job_id).await
    }

    async fn get_events(&self, job_id: &JobId) -> JobResult<Vec<Event>> {
        self.events.get_events(job_id).await
    }
}
