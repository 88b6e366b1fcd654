//! Job error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
///
/// Execution failures of a job's unit of work are deliberately absent: they
/// are plain values ([`crate::ExecutionFailure`]) consumed by the retry state
/// machine and never surface as errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job or event list not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Store backend error not covered by the Redis variants.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A persisted job record is missing fields or holds unknown values.
    #[error("Corrupt job record {job_id}: {reason}")]
    CorruptRecord { job_id: String, reason: String },

    /// Worker error.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl JobError {
    /// Returns true if the shared store could not be reached.
    ///
    /// Transport errors are not handled by the core: they propagate out of the
    /// worker loop and the process is expected to restart.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            JobError::Redis(_) | JobError::Pool(_) | JobError::Backend(_)
        )
    }

    /// Returns true if this error should be reported to clients as not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_transport() {
        let err = JobError::NotFound("job-123".into());
        assert!(err.is_not_found());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_backend_is_transport() {
        let err = JobError::Backend("connection reset".into());
        assert!(err.is_transport());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_serialization_is_not_transport() {
        let err: JobError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(!err.is_transport());
    }

    #[test]
    fn test_error_display_not_found() {
        let err = JobError::NotFound("abc".into());
        assert_eq!(err.to_string(), "Job not found: abc");
    }

    #[test]
    fn test_error_display_corrupt_record() {
        let err = JobError::CorruptRecord {
            job_id: "job-xyz".into(),
            reason: "unknown status 'paused'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("job-xyz") && msg.contains("paused"));
    }

    #[test]
    fn test_worker_error_display() {
        let err = JobError::Worker("already running".into());
        assert!(err.to_string().contains("already running"));
    }
}
