//! End-to-end job lifecycle against the in-memory store.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasker_jobs::{
    event_types, Event, ExecutionFailure, ExecutionResult, InMemoryStore, JobContext,
    JobExecutor, JobId, JobOutcome, JobService, JobServiceInterface, JobStatus, JobStore,
    LockManager, NULL_RESULT_MESSAGE, RedisKeys, RetryPolicy, SharedStore, SimulatedExecutor,
    SkipReason, Worker, WorkerConfig,
};
use tokio_test::{assert_err, assert_ok};

/// Fails the first `failures` attempts, then succeeds.
struct FlakyExecutor {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyExecutor {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl JobExecutor for FlakyExecutor {
    async fn execute(&self, ctx: &JobContext, _input: &Value) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.attempt < self.failures {
            Err(ExecutionFailure::new("connection reset"))
        } else {
            Ok(json!({"success": true, "attempt": ctx.attempt}))
        }
    }
}

/// Records the stored status of each job it runs, as seen mid-attempt.
struct RecordingExecutor {
    jobs: JobStore,
    failures: u32,
    seen: Mutex<Vec<(JobId, JobStatus, Option<u32>)>>,
}

impl RecordingExecutor {
    fn new(store: &InMemoryStore, failures: u32) -> Self {
        Self {
            jobs: JobStore::new(Arc::new(store.clone()), RedisKeys::default()),
            failures,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<(JobId, JobStatus, Option<u32>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobExecutor for RecordingExecutor {
    async fn execute(&self, ctx: &JobContext, _input: &Value) -> ExecutionResult {
        let job = self.jobs.get(&ctx.job_id).await.unwrap();
        self.seen
            .lock()
            .unwrap()
            .push((ctx.job_id.clone(), job.status, job.retry_count));

        if ctx.attempt < self.failures {
            Err(ExecutionFailure::new("try again"))
        } else {
            Ok(json!({"done": true}))
        }
    }
}

/// Succeeds without producing a value.
struct NullExecutor;

#[async_trait]
impl JobExecutor for NullExecutor {
    async fn execute(&self, _ctx: &JobContext, _input: &Value) -> ExecutionResult {
        Ok(Value::Null)
    }
}

struct PanickingExecutor;

#[async_trait]
impl JobExecutor for PanickingExecutor {
    async fn execute(&self, _ctx: &JobContext, _input: &Value) -> ExecutionResult {
        panic!("executor blew up");
    }
}

struct Harness {
    store: InMemoryStore,
    service: JobService,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let service = JobService::new(Arc::new(store.clone()), RedisKeys::default(), "job_queue");
        Self { store, service }
    }

    fn worker(&self, executor: Arc<dyn JobExecutor>) -> Worker {
        Worker::new(
            Arc::new(self.store.clone()),
            RedisKeys::default(),
            executor,
            RetryPolicy::default(),
            WorkerConfig::default(),
        )
    }

    /// Worker-emitted events, without `job_created`.
    async fn worker_events(&self, id: &JobId) -> Vec<Event> {
        assert_ok!(self.service.get_events(id).await)
            .into_iter()
            .filter(|e| e.event_type != event_types::JOB_CREATED)
            .collect()
    }
}

fn types(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.event_type.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_exhausts_retries() {
    let harness = Harness::new();
    let executor = Arc::new(FlakyExecutor::new(u32::MAX));
    let worker = harness.worker(executor.clone());
    let job = assert_ok!(harness.service.create_job(json!({"task": "hello"})).await);

    let outcome = assert_ok!(worker.process_job(&job.id).await);
    assert_eq!(outcome, JobOutcome::Failed);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

    let events = harness.worker_events(&job.id).await;
    assert_eq!(
        types(&events),
        vec![
            "job_started",
            "job_retrying",
            "job_started",
            "job_retrying",
            "job_started",
            "job_failed",
        ]
    );

    let attempts: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == event_types::JOB_STARTED)
        .map(|e| e.payload["attempt"].as_u64())
        .collect();
    assert_eq!(attempts, vec![Some(0), Some(1), Some(2)]);

    let backoffs: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == event_types::JOB_RETRYING)
        .map(|e| e.payload["backoff_seconds"].as_f64())
        .collect();
    assert_eq!(backoffs, vec![Some(1.0), Some(2.0)]);

    let failed = &events[5].payload;
    assert_eq!(failed["total_attempts"], json!(3));
    assert_eq!(failed["error"], json!("connection reset"));

    let stored = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.retry_count, Some(3));
    assert_eq!(stored.result, None);
    assert!(!harness.store.contains_key(&format!("lock:job:{}", job.id)));
    assert_eq!(worker.jobs_failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success() {
    let harness = Harness::new();
    let worker = harness.worker(Arc::new(SimulatedExecutor::new(Duration::from_secs(10))));
    let job = assert_ok!(harness.service.create_job(json!({"task": "hello"})).await);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Completed);

    let events = harness.worker_events(&job.id).await;
    assert_eq!(types(&events), vec!["job_started", "job_completed"]);
    assert_eq!(events[1].payload["attempt"], json!(0));

    let stored = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.result, Some(json!({"success": true})));
    assert_eq!(stored.retry_count, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_success_after_retry() {
    let harness = Harness::new();
    let worker = harness.worker(Arc::new(FlakyExecutor::new(1)));
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Completed);

    let events = harness.worker_events(&job.id).await;
    assert_eq!(
        types(&events),
        vec!["job_started", "job_retrying", "job_started", "job_completed"]
    );

    let stored = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(stored.retry_count, Some(1));
    assert_eq!(stored.result, Some(json!({"success": true, "attempt": 1})));
}

#[tokio::test(start_paused = true)]
async fn test_status_moves_through_processing_to_terminal() {
    let harness = Harness::new();
    let executor = Arc::new(RecordingExecutor::new(&harness.store, 2));
    let worker = harness.worker(executor.clone());
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    let before = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(before.status, JobStatus::Queued);
    assert_eq!(before.retry_count, None);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Completed);

    let mid_attempt: Vec<_> = executor
        .seen()
        .into_iter()
        .map(|(_, status, retry_count)| (status, retry_count))
        .collect();
    assert_eq!(
        mid_attempt,
        vec![
            (JobStatus::Processing, Some(0)),
            (JobStatus::Processing, Some(1)),
            (JobStatus::Processing, Some(2)),
        ]
    );

    let after = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(after.status, JobStatus::Completed);
    assert_eq!(after.retry_count, Some(2));
    assert_eq!(after.result, Some(json!({"done": true})));
}

#[tokio::test(start_paused = true)]
async fn test_null_result_is_a_failed_attempt() {
    let harness = Harness::new();
    let worker = harness.worker(Arc::new(NullExecutor));
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Failed);

    let stored = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.result, None);

    let events = harness.worker_events(&job.id).await;
    assert_eq!(
        types(&events),
        vec![
            "job_started",
            "job_retrying",
            "job_started",
            "job_retrying",
            "job_started",
            "job_failed",
        ]
    );
    assert_eq!(events[5].payload["error"], json!(NULL_RESULT_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn test_completed_job_is_not_reprocessed() {
    let harness = Harness::new();
    let executor = Arc::new(FlakyExecutor::new(0));
    let worker = harness.worker(executor.clone());
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Completed);
    assert_eq!(
        assert_ok!(worker.process_job(&job.id).await),
        JobOutcome::Skipped(SkipReason::Completed)
    );

    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.worker_events(&job.id).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_locked_job_is_skipped() {
    let harness = Harness::new();
    let executor = Arc::new(FlakyExecutor::new(0));
    let worker = harness.worker(executor.clone());
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    let other = LockManager::new(Arc::new(harness.store.clone()), RedisKeys::default(), "other");
    assert!(assert_ok!(other.try_acquire(&job.id, Duration::from_secs(60)).await));

    assert_eq!(
        assert_ok!(worker.process_job(&job.id).await),
        JobOutcome::Skipped(SkipReason::Locked)
    );
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        harness.store.get_value(&format!("lock:job:{}", job.id)).as_deref(),
        Some("other")
    );

    let stored = assert_ok!(harness.service.get_job(&job.id).await);
    assert_eq!(stored.status, JobStatus::Queued);
}

#[tokio::test(start_paused = true)]
async fn test_executor_panic_releases_lock() {
    let harness = Harness::new();
    let worker = harness.worker(Arc::new(PanickingExecutor));
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    assert_eq!(assert_ok!(worker.process_job(&job.id).await), JobOutcome::Failed);
    assert!(!harness.store.contains_key(&format!("lock:job:{}", job.id)));

    let events = harness.worker_events(&job.id).await;
    let error = events[events.len() - 1].payload["error"].as_str().unwrap_or_default();
    assert!(error.contains("executor blew up"));
}

#[tokio::test(start_paused = true)]
async fn test_run_drains_queue_in_order_and_stops() {
    let harness = Harness::new();
    let executor = Arc::new(RecordingExecutor::new(&harness.store, 0));
    let worker = harness.worker(executor.clone());

    let mut ids = Vec::new();
    for n in 0..3 {
        ids.push(assert_ok!(harness.service.create_job(json!({"n": n})).await).id);
    }

    let handle = worker.clone().spawn();
    while worker.jobs_processed() < 3 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(worker.is_running());
    assert_ok!(handle.shutdown(Duration::from_secs(30)).await);
    assert!(!worker.is_running());

    let run_order: Vec<_> = executor.seen().into_iter().map(|(id, _, _)| id).collect();
    assert_eq!(run_order, ids);

    for id in &ids {
        let stored = assert_ok!(harness.service.get_job(id).await);
        assert_eq!(stored.status, JobStatus::Completed);
    }
    assert_eq!(harness.store.list_len("job_queue"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_backoff_requeues_job() {
    let harness = Harness::new();
    let worker = harness.worker(Arc::new(FlakyExecutor::new(u32::MAX)));
    let job = assert_ok!(harness.service.create_job(json!({})).await);

    let handle = worker.clone().spawn();
    while harness.worker_events(&job.id).await.len() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_ok!(handle.shutdown(Duration::from_secs(30)).await);

    let events = harness.worker_events(&job.id).await;
    assert_eq!(types(&events), vec!["job_started", "job_retrying"]);
    assert!(!harness.store.contains_key(&format!("lock:job:{}", job.id)));
    assert_eq!(
        assert_ok!(harness.store.lrange("job_queue", 0, -1).await),
        vec![job.id.to_string()]
    );
}

#[tokio::test]
async fn test_missing_job_lookups() {
    let harness = Harness::new();
    let unknown = JobId::from("nonexistent-id");

    assert!(assert_err!(harness.service.get_job(&unknown).await).is_not_found());
    assert!(assert_err!(harness.service.get_events(&unknown).await).is_not_found());
}
