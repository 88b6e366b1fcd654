//! Per-job locks with expiry.

use crate::error::JobResult;
use crate::job::JobId;
use crate::redis::RedisKeys;
use crate::store::SharedStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default lock TTL. Bounds how long a crashed worker can hold a job.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);

/// Advisory per-job mutual exclusion.
///
/// The lock value is the holder's token; only its presence matters. A holder
/// that crashes loses the lock once the TTL expires, so execution is
/// at-least-once across crashes.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn SharedStore>,
    keys: RedisKeys,
    token: String,
}

impl LockManager {
    /// Create a lock manager that stamps locks with `token`.
    pub fn new(store: Arc<dyn SharedStore>, keys: RedisKeys, token: impl Into<String>) -> Self {
        Self {
            store,
            keys,
            token: token.into(),
        }
    }

    /// Try to take the lock for a job. Returns false if another holder has it.
    pub async fn try_acquire(&self, job_id: &JobId, ttl: Duration) -> JobResult<bool> {
        let acquired = self
            .store
            .set_nx_ex(&self.keys.lock(job_id.as_str()), &self.token, ttl)
            .await?;

        debug!(job_id = %job_id, acquired, ttl_secs = ttl.as_secs(), "Lock acquisition");
        Ok(acquired)
    }

    /// Delete the lock for a job, whoever holds it.
    pub async fn release(&self, job_id: &JobId) -> JobResult<()> {
        self.store.del(&self.keys.lock(job_id.as_str())).await?;
        debug!(job_id = %job_id, "Lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn managers() -> (InMemoryStore, LockManager, LockManager) {
        let store = InMemoryStore::new();
        let shared: Arc<dyn SharedStore> = Arc::new(store.clone());
        let a = LockManager::new(shared.clone(), RedisKeys::default(), "worker-a");
        let b = LockManager::new(shared, RedisKeys::default(), "worker-b");
        (store, a, b)
    }

    #[tokio::test]
    async fn test_second_acquire_fails_while_held() {
        let (store, a, b) = managers();
        let job = JobId::from("job-1");

        assert!(a.try_acquire(&job, DEFAULT_LOCK_TTL).await.unwrap());
        assert!(!b.try_acquire(&job, DEFAULT_LOCK_TTL).await.unwrap());
        assert_eq!(store.get_value("lock:job:job-1").as_deref(), Some("worker-a"));
    }

    #[tokio::test]
    async fn test_release_allows_reacquire() {
        let (_, a, b) = managers();
        let job = JobId::from("job-1");

        assert!(a.try_acquire(&job, DEFAULT_LOCK_TTL).await.unwrap());
        a.release(&job).await.unwrap();
        assert!(b.try_acquire(&job, DEFAULT_LOCK_TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_locks_are_per_job() {
        let (_, a, b) = managers();

        assert!(a.try_acquire(&JobId::from("job-1"), DEFAULT_LOCK_TTL).await.unwrap());
        assert!(b.try_acquire(&JobId::from("job-2"), DEFAULT_LOCK_TTL).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_taken_over() {
        let (_, a, b) = managers();
        let job = JobId::from("job-1");
        let ttl = Duration::from_secs(5);

        assert!(a.try_acquire(&job, ttl).await.unwrap());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(b.try_acquire(&job, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_without_lock_is_ok() {
        let (_, a, _) = managers();
        assert!(a.release(&JobId::from("never-locked")).await.is_ok());
    }
}
