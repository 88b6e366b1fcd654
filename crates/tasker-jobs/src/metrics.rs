//! Metrics for the job engine.
//!
//! Recorded through the `metrics` facade; without an installed recorder every
//! call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Total jobs submitted.
    pub const JOBS_CREATED_TOTAL: &str = "tasker_jobs_created_total";
    /// Total attempts started.
    pub const JOBS_STARTED_TOTAL: &str = "tasker_jobs_started_total";
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "tasker_jobs_completed_total";
    /// Total failed attempts that were retried.
    pub const JOBS_RETRIED_TOTAL: &str = "tasker_jobs_retried_total";
    /// Total jobs that exhausted their attempts.
    pub const JOBS_FAILED_TOTAL: &str = "tasker_jobs_failed_total";
    /// Total dequeued jobs abandoned without an attempt.
    pub const JOBS_SKIPPED_TOTAL: &str = "tasker_jobs_skipped_total";
    /// Job processing duration in seconds, lock to release.
    pub const JOB_DURATION_SECONDS: &str = "tasker_job_duration_seconds";
}

/// Why a dequeued job was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already completed.
    Completed,
    /// Another worker holds the lock.
    Locked,
    /// No job record exists for the ID.
    Missing,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            SkipReason::Completed => "completed",
            SkipReason::Locked => "locked",
            SkipReason::Missing => "missing",
        }
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOBS_CREATED_TOTAL, "Total number of jobs submitted");
    describe_counter!(names::JOBS_STARTED_TOTAL, "Total number of job attempts started");
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(names::JOBS_RETRIED_TOTAL, "Total number of job retries");
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of jobs that exhausted their attempts"
    );
    describe_counter!(
        names::JOBS_SKIPPED_TOTAL,
        "Total number of dequeued jobs abandoned before an attempt"
    );
    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job processing duration in seconds"
    );
}

/// Job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job submitted.
    pub fn job_created(queue: &str) {
        counter!(names::JOBS_CREATED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record an attempt started.
    pub fn job_started(queue: &str) {
        counter!(names::JOBS_STARTED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record a job completed.
    pub fn job_completed(queue: &str, duration: Duration) {
        counter!(names::JOBS_COMPLETED_TOTAL, "queue" => queue.to_string()).increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "queue" => queue.to_string(),
            "status" => "completed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a retry.
    pub fn job_retried(queue: &str, attempt: u32) {
        counter!(
            names::JOBS_RETRIED_TOTAL,
            "queue" => queue.to_string(),
            "attempt" => attempt.to_string()
        )
        .increment(1);
    }

    /// Record a job failed.
    pub fn job_failed(queue: &str, duration: Duration) {
        counter!(names::JOBS_FAILED_TOTAL, "queue" => queue.to_string()).increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "queue" => queue.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a dequeued job that was abandoned.
    pub fn job_skipped(queue: &str, reason: SkipReason) {
        counter!(
            names::JOBS_SKIPPED_TOTAL,
            "queue" => queue.to_string(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }
}
