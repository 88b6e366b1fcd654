//! Pluggable unit of work.

use crate::config::ExecutorConfig;
use crate::job::JobId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Failure reported by an executor. Drives retries; never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// Human-readable reason, recorded in retry and failure events.
    pub message: String,
}

impl ExecutionFailure {
    /// Create a failure with the given reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one attempt: a result value or a failure.
pub type ExecutionResult = Result<Value, ExecutionFailure>;

/// Job execution context.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Job ID.
    pub job_id: JobId,

    /// Current attempt index (0-based).
    pub attempt: u32,

    /// Maximum attempts allowed.
    pub max_attempts: u32,

    /// Worker ID processing this job.
    pub worker_id: String,

    /// Attempt started at this time.
    pub started_at: DateTime<Utc>,
}

/// The work a job performs, opaque to the engine.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one attempt of the job against its submitted input.
    async fn execute(&self, ctx: &JobContext, input: &Value) -> ExecutionResult;
}

/// Stand-in executor: waits, then reports success.
///
/// With `fail_on_key` set, inputs carrying that key as `true` fail every
/// attempt, which exercises the retry path end to end.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    work: Duration,
    fail_on_key: Option<String>,
}

impl SimulatedExecutor {
    /// Create a simulated executor that works for `work`.
    pub fn new(work: Duration) -> Self {
        Self {
            work,
            fail_on_key: None,
        }
    }

    /// Fail inputs where `key` is `true`.
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        self.fail_on_key = Some(key.into());
        self
    }
}

impl From<&ExecutorConfig> for SimulatedExecutor {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            work: config.simulated_work(),
            fail_on_key: config.fail_on_key.clone(),
        }
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn execute(&self, ctx: &JobContext, input: &Value) -> ExecutionResult {
        tokio::time::sleep(self.work).await;

        if let Some(key) = &self.fail_on_key {
            if input.get(key).and_then(Value::as_bool) == Some(true) {
                return Err(ExecutionFailure::new(format!(
                    "simulated failure on attempt {} ('{}' set)",
                    ctx.attempt, key
                )));
            }
        }

        Ok(json!({"success": true}))
    }
}
