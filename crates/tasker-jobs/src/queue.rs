//! FIFO job queue over a shared store list.

use crate::error::JobResult;
use crate::job::JobId;
use crate::redis::RedisKeys;
use crate::store::SharedStore;
use std::sync::Arc;
use tracing::debug;

/// FIFO queue of job identifiers.
///
/// Entries carry only the job ID; the job record lives in the
/// [`JobStore`](crate::job_store::JobStore). No priorities, no peeking and no
/// blocking pop: callers poll.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn SharedStore>,
    keys: RedisKeys,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(store: Arc<dyn SharedStore>, keys: RedisKeys) -> Self {
        Self { store, keys }
    }

    /// Append a job ID to the tail of the named queue.
    pub async fn enqueue(&self, queue_name: &str, job_id: &JobId) -> JobResult<()> {
        self.store
            .rpush(&self.keys.queue(queue_name), job_id.as_str())
            .await?;

        debug!(job_id = %job_id, queue = %queue_name, "Enqueued job");
        Ok(())
    }

    /// Remove and return the head of the named queue.
    ///
    /// Returns `None` when the queue is empty; never blocks.
    pub async fn dequeue(&self, queue_name: &str) -> JobResult<Option<JobId>> {
        let job_id = self
            .store
            .lpop(&self.keys.queue(queue_name))
            .await?
            .map(JobId::from);

        if let Some(id) = &job_id {
            debug!(job_id = %id, queue = %queue_name, "Dequeued job");
        }

        Ok(job_id)
    }
}
