//! Job identifiers, statuses and the job view returned to clients.

use crate::error::{JobError, JobResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the job ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job status enumeration.
///
/// Transitions are monotone: `Queued -> Processing -> Completed | Failed`.
/// `Processing -> Processing` only happens on a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted and waiting in the queue.
    Queued,
    /// A worker holds the lock and is attempting it.
    Processing,
    /// Finished successfully; terminal.
    Completed,
    /// Retries exhausted; terminal until resubmitted.
    Failed,
}

impl JobStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Queued
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Field names of the `job:{id}` hash.
pub mod fields {
    pub const ID: &str = "id";
    pub const STATUS: &str = "status";
    pub const INPUT_DATA: &str = "input_data";
    pub const RESULT: &str = "result";
    pub const RETRY_COUNT: &str = "retry_count";
}

/// Job view with structured fields decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job ID.
    pub id: JobId,

    /// Current status.
    pub status: JobStatus,

    /// Submitted payload, opaque to the engine.
    pub input_data: Value,

    /// Result of the unit of work; set iff the job completed.
    pub result: Option<Value>,

    /// Attempt index, present once processing has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl Job {
    /// Creates the view of a freshly submitted job.
    pub fn queued(id: JobId, input_data: Value) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            input_data,
            result: None,
            retry_count: None,
        }
    }

    /// Encodes the job as hash fields.
    ///
    /// `input_data` and `result` are stored as JSON text; an absent result is
    /// stored as `"null"`.
    pub fn to_fields(&self) -> JobResult<Vec<(String, String)>> {
        let result = match &self.result {
            Some(value) => serde_json::to_string(value)?,
            None => "null".to_string(),
        };

        let mut out = vec![
            (fields::ID.to_string(), self.id.to_string()),
            (fields::STATUS.to_string(), self.status.to_string()),
            (
                fields::INPUT_DATA.to_string(),
                serde_json::to_string(&self.input_data)?,
            ),
            (fields::RESULT.to_string(), result),
        ];

        if let Some(count) = self.retry_count {
            out.push((fields::RETRY_COUNT.to_string(), count.to_string()));
        }

        Ok(out)
    }

    /// Decodes a job from hash fields read back from the store.
    ///
    /// A missing or `"null"` result decodes to `None`.
    pub fn from_fields(job_id: &JobId, mut map: HashMap<String, String>) -> JobResult<Self> {
        let corrupt = |reason: String| JobError::CorruptRecord {
            job_id: job_id.to_string(),
            reason,
        };

        let status = map
            .get(fields::STATUS)
            .ok_or_else(|| corrupt("missing status".to_string()))?
            .parse::<JobStatus>()
            .map_err(corrupt)?;

        let input_data = match map.remove(fields::INPUT_DATA) {
            Some(text) => serde_json::from_str(&text)?,
            None => Value::Null,
        };

        let result = match map.remove(fields::RESULT) {
            Some(text) if !text.is_empty() => match serde_json::from_str::<Value>(&text)? {
                Value::Null => None,
                value => Some(value),
            },
            _ => None,
        };

        let retry_count = match map.get(fields::RETRY_COUNT) {
            Some(text) => Some(
                text.parse::<u32>()
                    .map_err(|e| corrupt(format!("bad retry_count '{text}': {e}")))?,
            ),
            None => None,
        };

        let id = map
            .remove(fields::ID)
            .map(JobId::from)
            .unwrap_or_else(|| job_id.clone());

        Ok(Self {
            id,
            status,
            input_data,
            result,
            retry_count,
        })
    }
}
