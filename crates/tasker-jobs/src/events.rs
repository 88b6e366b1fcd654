//! Job lifecycle event log.
//!
//! Every event goes to the `tracing` stream under the `tasker::events`
//! target. Job-scoped events (payload carries a string `job_id`) are also
//! appended to the job's `event_log:{id}` list, in emission order.

use crate::error::{JobError, JobResult};
use crate::job::JobId;
use crate::redis::RedisKeys;
use crate::store::SharedStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Event type names emitted by the engine.
pub mod event_types {
    pub const JOB_CREATED: &str = "job_created";
    pub const JOB_STARTED: &str = "job_started";
    pub const JOB_RETRYING: &str = "job_retrying";
    pub const JOB_COMPLETED: &str = "job_completed";
    pub const JOB_FAILED: &str = "job_failed";
}

/// Immutable lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type, e.g. `job_started`.
    #[serde(alias = "event")]
    pub event_type: String,

    /// When the event was emitted (UTC).
    pub timestamp: DateTime<Utc>,

    /// Event payload; includes `job_id` when job-scoped.
    pub payload: Value,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn now(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// The job this event belongs to, if any.
    pub fn job_id(&self) -> Option<JobId> {
        self.payload
            .get("job_id")
            .and_then(Value::as_str)
            .map(JobId::from)
    }
}

/// Append-only, per-job event history.
#[derive(Clone)]
pub struct EventLog {
    store: Arc<dyn SharedStore>,
    keys: RedisKeys,
}

impl EventLog {
    /// Create a new event log.
    pub fn new(store: Arc<dyn SharedStore>, keys: RedisKeys) -> Self {
        Self { store, keys }
    }

    /// Record an event.
    pub async fn emit(&self, event_type: &str, payload: Value) -> JobResult<Event> {
        let event = Event::now(event_type, payload);

        info!(
            target: "tasker::events",
            event = %event.event_type,
            timestamp = %event.timestamp.to_rfc3339(),
            payload = %event.payload,
            "Job event"
        );

        if let Some(job_id) = event.job_id() {
            let encoded = serde_json::to_string(&event)?;
            self.store
                .rpush(&self.keys.events(job_id.as_str()), &encoded)
                .await?;
        }

        Ok(event)
    }

    /// All events recorded for a job, oldest first.
    ///
    /// Fails with [`JobError::NotFound`] when nothing has been recorded; an
    /// unknown job and a job without events look the same.
    pub async fn get_events(&self, job_id: &JobId) -> JobResult<Vec<Event>> {
        let raw = self
            .store
            .lrange(&self.keys.events(job_id.as_str()), 0, -1)
            .await?;

        if raw.is_empty() {
            return Err(JobError::NotFound(job_id.to_string()));
        }

        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(JobError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use serde_json::json;

    fn event_log() -> (InMemoryStore, EventLog) {
        let store = InMemoryStore::new();
        let log = EventLog::new(Arc::new(store.clone()), RedisKeys::default());
        (store, log)
    }

    #[tokio::test]
    async fn test_no_events_is_not_found() {
        let (_, log) = event_log();
        let err = log.get_events(&JobId::from("no-events-job")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_single_event_is_returned() {
        let (_, log) = event_log();
        let job_id = JobId::from("job-1");

        let emitted = log
            .emit(event_types::JOB_STARTED, json!({"job_id": "job-1", "attempt": 0}))
            .await
            .unwrap();

        let events = log.get_events(&job_id).await.unwrap();
        assert_eq!(events, vec![emitted]);
    }

    #[tokio::test]
    async fn test_events_keep_append_order() {
        let (_, log) = event_log();
        for kind in [event_types::JOB_STARTED, event_types::JOB_COMPLETED] {
            log.emit(kind, json!({"job_id": "job-1"})).await.unwrap();
        }

        let kinds: Vec<_> = log
            .get_events(&JobId::from("job-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(kinds, vec!["job_started", "job_completed"]);
    }

    #[tokio::test]
    async fn test_unscoped_event_is_only_logged() {
        let (store, log) = event_log();
        log.emit("worker_started", json!({"worker_id": "w1"})).await.unwrap();
        assert_eq!(store.list_len("event_log:w1"), 0);
    }

    #[tokio::test]
    async fn test_reads_legacy_event_field() {
        let (store, log) = event_log();
        store
            .rpush(
                "event_log:job-1",
                r#"{"event": "job_started", "timestamp": "2024-01-01T00:00:00+00:00", "payload": {"job_id": "job-1"}}"#,
            )
            .await
            .unwrap();

        let events = log.get_events(&JobId::from("job-1")).await.unwrap();
        assert_eq!(events[0].event_type, "job_started");
        assert_eq!(events[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
