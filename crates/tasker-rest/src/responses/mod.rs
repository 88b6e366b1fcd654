//! API response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasker_jobs::{Event, Job, JobError, JobId};
use tracing::error;
use utoipa::ToSchema;

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Human-readable error message.
    pub detail: String,
}

/// Job view returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    /// Job ID.
    pub id: String,
    /// One of `queued`, `processing`, `completed`, `failed`.
    pub status: String,
    /// Submitted payload.
    #[schema(value_type = Object)]
    pub input_data: Value,
    /// Result of the job; null until it completes.
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            status: job.status.to_string(),
            input_data: job.input_data,
            result: job.result,
        }
    }
}

/// One entry of a job's event history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    /// Event type, e.g. `job_started`.
    pub event_type: String,
    /// Emission time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            event_type: event.event_type,
            timestamp: event.timestamp,
            payload: event.payload,
        }
    }
}

/// Event history of a job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobEventsResponse {
    /// Job ID.
    pub job_id: String,
    /// Events, oldest first.
    pub events: Vec<EventResponse>,
}

impl JobEventsResponse {
    /// Builds the response for `job_id`.
    pub fn new(job_id: &JobId, events: Vec<Event>) -> Self {
        Self {
            job_id: job_id.to_string(),
            events: events.into_iter().map(EventResponse::from).collect(),
        }
    }
}

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub JobError);

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = if self.0.is_not_found() {
            (StatusCode::NOT_FOUND, "Job not found".to_string())
        } else {
            error!(error = %self.0, transport = self.0.is_transport(), "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
        };

        (status, Json(ErrorDetail { detail })).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Helper to create a success response.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}
