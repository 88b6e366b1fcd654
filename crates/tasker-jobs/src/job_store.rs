//! Job records in the shared store.

use crate::error::{JobError, JobResult};
use crate::job::{fields, Job, JobId, JobStatus};
use crate::redis::RedisKeys;
use crate::store::SharedStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Reads and writes `job:{id}` hashes.
///
/// Writes are plain field updates, not transactions; only the lock holder
/// mutates a job once it has been queued.
#[derive(Clone)]
pub struct JobStore {
    store: Arc<dyn SharedStore>,
    keys: RedisKeys,
}

impl JobStore {
    /// Create a new job store.
    pub fn new(store: Arc<dyn SharedStore>, keys: RedisKeys) -> Self {
        Self { store, keys }
    }

    /// Write a complete job record.
    pub async fn insert(&self, job: &Job) -> JobResult<()> {
        let key = self.keys.job(job.id.as_str());
        self.store.hset_multiple(&key, &job.to_fields()?).await
    }

    /// Read a job. Fails with [`JobError::NotFound`] if no record exists.
    pub async fn get(&self, job_id: &JobId) -> JobResult<Job> {
        let map = self.store.hgetall(&self.keys.job(job_id.as_str())).await?;

        if map.is_empty() {
            return Err(JobError::NotFound(job_id.to_string()));
        }

        Job::from_fields(job_id, map)
    }

    /// Read only the status field. `None` if the job does not exist.
    pub async fn status(&self, job_id: &JobId) -> JobResult<Option<JobStatus>> {
        let status = self
            .store
            .hget(&self.keys.job(job_id.as_str()), fields::STATUS)
            .await?;

        status
            .map(|s| {
                s.parse::<JobStatus>().map_err(|reason| JobError::CorruptRecord {
                    job_id: job_id.to_string(),
                    reason,
                })
            })
            .transpose()
    }

    /// Mark a job as being attempted.
    pub async fn mark_processing(&self, job_id: &JobId, attempt: u32) -> JobResult<()> {
        self.update(
            job_id,
            vec![
                (fields::STATUS, JobStatus::Processing.to_string()),
                (fields::RETRY_COUNT, attempt.to_string()),
            ],
        )
        .await
    }

    /// Mark a job as completed with its result.
    pub async fn mark_completed(&self, job_id: &JobId, result: &Value) -> JobResult<()> {
        self.update(
            job_id,
            vec![
                (fields::STATUS, JobStatus::Completed.to_string()),
                (fields::RESULT, serde_json::to_string(result)?),
            ],
        )
        .await
    }

    /// Mark a job as failed after `attempts` attempts.
    pub async fn mark_failed(&self, job_id: &JobId, attempts: u32) -> JobResult<()> {
        self.update(
            job_id,
            vec![
                (fields::STATUS, JobStatus::Failed.to_string()),
                (fields::RETRY_COUNT, attempts.to_string()),
            ],
        )
        .await
    }

    async fn update(&self, job_id: &JobId, changes: Vec<(&str, String)>) -> JobResult<()> {
        let changes: Vec<(String, String)> = changes
            .into_iter()
            .map(|(field, value)| (field.to_string(), value))
            .collect();

        self.store
            .hset_multiple(&self.keys.job(job_id.as_str()), &changes)
            .await?;

        debug!(job_id = %job_id, ?changes, "Updated job record");
        Ok(())
    }
}
