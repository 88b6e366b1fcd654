//! Worker loop and the per-job execution state machine.
//!
//! A job moves `Idle -> Locked -> Attempting(n)` and from there to
//! `Completed`, `Backoff(n) -> Attempting(n + 1)` or `Failed`. The lock is
//! released on every exit path.

use crate::config::{JobsConfig, WorkerConfig};
use crate::error::{JobError, JobResult};
use crate::events::{event_types, EventLog};
use crate::executor::{ExecutionFailure, ExecutionResult, JobContext, JobExecutor};
use crate::job::{JobId, JobStatus};
use crate::job_store::JobStore;
use crate::lock::LockManager;
use crate::metrics::{JobMetrics, SkipReason};
use crate::queue::JobQueue;
use crate::redis::RedisKeys;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::store::SharedStore;
use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Failure message recorded when an executor succeeds without a value.
pub const NULL_RESULT_MESSAGE: &str = "executor returned a null result";

/// How a dequeued job left the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// An attempt succeeded.
    Completed,
    /// Every attempt failed.
    Failed,
    /// Abandoned before any attempt.
    Skipped(SkipReason),
    /// Shutdown arrived during a backoff; the job was put back on the queue.
    Interrupted,
}

/// Single-queue job worker.
///
/// Cloning yields a handle to the same worker: clones share the shutdown
/// channel, the running flag and the counters.
#[derive(Clone)]
pub struct Worker {
    /// Unique worker ID, also the lock token.
    id: String,

    queue: JobQueue,
    jobs: JobStore,
    locks: LockManager,
    events: EventLog,
    executor: Arc<dyn JobExecutor>,
    retry: RetryPolicy,
    config: WorkerConfig,

    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,

    /// Set by [`Worker::stop`]; covers receivers subscribed after the send.
    stopping: Arc<AtomicBool>,

    /// Running flag.
    running: Arc<AtomicBool>,

    /// Jobs completed counter.
    jobs_processed: Arc<AtomicU64>,

    /// Jobs failed counter.
    jobs_failed: Arc<AtomicU64>,
}

impl Worker {
    /// Create a new worker.
    pub fn new(
        store: Arc<dyn SharedStore>,
        keys: RedisKeys,
        executor: Arc<dyn JobExecutor>,
        retry: RetryPolicy,
        config: WorkerConfig,
    ) -> Self {
        let id = format!("worker-{}", Uuid::new_v4());
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            queue: JobQueue::new(store.clone(), keys.clone()),
            jobs: JobStore::new(store.clone(), keys.clone()),
            locks: LockManager::new(store.clone(), keys.clone(), id.clone()),
            events: EventLog::new(store, keys),
            id,
            executor,
            retry,
            config,
            shutdown_tx,
            stopping: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            jobs_processed: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a worker from the engine configuration.
    pub fn from_config(
        store: Arc<dyn SharedStore>,
        executor: Arc<dyn JobExecutor>,
        config: &JobsConfig,
    ) -> Self {
        Self::new(
            store,
            RedisKeys::new(config.redis.key_prefix.clone()),
            executor,
            RetryPolicy::from(&config.retry),
            config.worker.clone(),
        )
    }

    /// Run the worker loop until [`Worker::stop`] is called.
    ///
    /// Returns early with the error if the shared store fails; a failing job
    /// never stops the loop.
    pub async fn run(&self) -> JobResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobError::Worker("Worker already running".to_string()));
        }

        info!(
            worker_id = %self.id,
            queue = %self.config.queue_name,
            max_attempts = self.retry.max_attempts,
            "Starting worker"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let result = self.poll_loop(&mut shutdown_rx).await;

        self.running.store(false, Ordering::SeqCst);
        self.stopping.store(false, Ordering::SeqCst);

        match &result {
            Ok(()) => info!(
                worker_id = %self.id,
                processed = self.jobs_processed(),
                failed = self.jobs_failed(),
                "Worker stopped"
            ),
            Err(e) => error!(worker_id = %self.id, error = %e, "Worker stopped on store error"),
        }

        result
    }

    async fn poll_loop(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> JobResult<()> {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                info!(worker_id = %self.id, "Received shutdown signal");
                return Ok(());
            }

            match self.queue.dequeue(&self.config.queue_name).await? {
                Some(job_id) => {
                    let span = tracing::info_span!("job", job_id = %job_id, worker_id = %self.id);
                    self.process_job(&job_id).instrument(span).await?;
                }
                None => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!(worker_id = %self.id, "Received shutdown signal");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.config.poll_interval()) => {}
                    }
                }
            }
        }
    }

    /// Drive one dequeued job through the execution state machine.
    pub async fn process_job(&self, job_id: &JobId) -> JobResult<JobOutcome> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let queue_name = self.config.queue_name.as_str();

        match self.jobs.status(job_id).await? {
            Some(JobStatus::Completed) => {
                debug!(job_id = %job_id, "Job already completed, skipping");
                JobMetrics::job_skipped(queue_name, SkipReason::Completed);
                return Ok(JobOutcome::Skipped(SkipReason::Completed));
            }
            None => {
                warn!(job_id = %job_id, "Dequeued job has no record, skipping");
                JobMetrics::job_skipped(queue_name, SkipReason::Missing);
                return Ok(JobOutcome::Skipped(SkipReason::Missing));
            }
            Some(_) => {}
        }

        if !self.locks.try_acquire(job_id, self.config.lock_ttl()).await? {
            debug!(job_id = %job_id, "Job locked by another worker, skipping");
            JobMetrics::job_skipped(queue_name, SkipReason::Locked);
            return Ok(JobOutcome::Skipped(SkipReason::Locked));
        }

        let started = Instant::now();
        let outcome = self.attempt_loop(job_id, &mut shutdown_rx).await;

        let released = self.locks.release(job_id).await;
        if let (Err(_), Err(e)) = (&outcome, &released) {
            error!(job_id = %job_id, error = %e, "Failed to release job lock");
        }
        let outcome = outcome?;
        released?;

        match outcome {
            JobOutcome::Completed => {
                self.jobs_processed.fetch_add(1, Ordering::Relaxed);
                JobMetrics::job_completed(queue_name, started.elapsed());
            }
            JobOutcome::Failed => {
                self.jobs_failed.fetch_add(1, Ordering::Relaxed);
                JobMetrics::job_failed(queue_name, started.elapsed());
            }
            JobOutcome::Interrupted => {
                // Lock is already gone, so the next dequeue can take it.
                self.queue.enqueue(queue_name, job_id).await?;
                warn!(job_id = %job_id, "Shutdown during backoff, job requeued");
            }
            JobOutcome::Skipped(_) => {}
        }

        Ok(outcome)
    }

    async fn attempt_loop(
        &self,
        job_id: &JobId,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> JobResult<JobOutcome> {
        let input = self.jobs.get(job_id).await?.input_data;
        let mut attempt = 0;

        loop {
            self.jobs.mark_processing(job_id, attempt).await?;
            self.events
                .emit(
                    event_types::JOB_STARTED,
                    json!({"job_id": job_id, "attempt": attempt}),
                )
                .await?;
            JobMetrics::job_started(&self.config.queue_name);

            let ctx = JobContext {
                job_id: job_id.clone(),
                attempt,
                max_attempts: self.retry.max_attempts,
                worker_id: self.id.clone(),
                started_at: Utc::now(),
            };
            let result = self.execute(&ctx, &input).await;

            match self.retry.decide(attempt, result) {
                RetryDecision::Complete(value) => {
                    self.jobs.mark_completed(job_id, &value).await?;
                    self.events
                        .emit(
                            event_types::JOB_COMPLETED,
                            json!({"job_id": job_id, "attempt": attempt}),
                        )
                        .await?;
                    return Ok(JobOutcome::Completed);
                }
                RetryDecision::Retry { failure, backoff } => {
                    warn!(
                        job_id = %job_id,
                        attempt,
                        error = %failure,
                        backoff_ms = backoff.as_millis() as u64,
                        "Job attempt failed, retrying"
                    );
                    self.events
                        .emit(
                            event_types::JOB_RETRYING,
                            json!({
                                "job_id": job_id,
                                "attempt": attempt,
                                "error": failure.message,
                                "backoff_seconds": backoff.as_secs_f64(),
                            }),
                        )
                        .await?;
                    JobMetrics::job_retried(&self.config.queue_name, attempt + 1);

                    if self.backoff(backoff, shutdown_rx).await {
                        return Ok(JobOutcome::Interrupted);
                    }
                    attempt += 1;
                }
                RetryDecision::Fail {
                    failure,
                    total_attempts,
                } => {
                    error!(job_id = %job_id, total_attempts, error = %failure, "Job failed");
                    self.jobs.mark_failed(job_id, total_attempts).await?;
                    self.events
                        .emit(
                            event_types::JOB_FAILED,
                            json!({
                                "job_id": job_id,
                                "error": failure.message,
                                "total_attempts": total_attempts,
                            }),
                        )
                        .await?;
                    return Ok(JobOutcome::Failed);
                }
            }
        }
    }

    /// Run the executor; a panic counts as a failed attempt.
    ///
    /// A `null` success is also a failed attempt: a completed job always
    /// carries a result, and `null` is how the store spells "no result".
    async fn execute(&self, ctx: &JobContext, input: &Value) -> ExecutionResult {
        match AssertUnwindSafe(self.executor.execute(ctx, input))
            .catch_unwind()
            .await
        {
            Ok(Ok(Value::Null)) => {
                warn!(job_id = %ctx.job_id, attempt = ctx.attempt, "Executor returned a null result");
                Err(ExecutionFailure::new(NULL_RESULT_MESSAGE))
            }
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(job_id = %ctx.job_id, attempt = ctx.attempt, panic = %message, "Executor panicked");
                Err(ExecutionFailure::new(format!("executor panicked: {}", message)))
            }
        }
    }

    /// Sleep through a backoff. Returns true if shutdown cut it short.
    async fn backoff(&self, delay: Duration, shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
        if self.stopping.load(Ordering::SeqCst) {
            return true;
        }

        tokio::select! {
            _ = shutdown_rx.recv() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// Signal the worker to stop at its next suspension point.
    pub fn stop(&self) {
        info!(worker_id = %self.id, "Stopping worker...");
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Spawn the worker loop onto the runtime.
    pub fn spawn(self) -> WorkerHandle {
        let worker = self.clone();
        let task = tokio::spawn(async move { worker.run().await });
        WorkerHandle { worker: self, task }
    }

    /// Check if the worker loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the number of jobs completed.
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get the number of jobs failed.
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Get the worker ID.
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A spawned worker loop.
pub struct WorkerHandle {
    worker: Worker,
    task: JoinHandle<JobResult<()>>,
}

impl WorkerHandle {
    /// Wait for the loop to exit on its own.
    ///
    /// Must not be awaited again once it has returned.
    pub async fn join(&mut self) -> JobResult<()> {
        (&mut self.task)
            .await
            .map_err(|e| JobError::Worker(format!("Worker task failed: {}", e)))?
    }

    /// Stop the worker and wait up to `timeout` for the loop to exit.
    ///
    /// A loop that outlives the timeout is aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> JobResult<()> {
        self.worker.stop();

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(joined) => joined.map_err(|e| JobError::Worker(format!("Worker task failed: {}", e)))?,
            Err(_) => {
                warn!(
                    worker_id = %self.worker.id(),
                    timeout_secs = timeout.as_secs(),
                    "Worker did not stop in time, aborting"
                );
                self.task.abort();
                Err(JobError::Worker(format!(
                    "Worker did not stop within {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}
