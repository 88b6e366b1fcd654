//! Job submission and status REST API controller.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasker_jobs::JobId;
use utoipa::ToSchema;

use crate::responses::{ok, ApiResult, ErrorDetail, JobEventsResponse, JobResponse};
use crate::state::AppState;

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/", post(create_job))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/events", get(get_job_events))
}

/// Request body for job submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    /// Arbitrary JSON payload handed to the executor.
    #[schema(value_type = Object)]
    pub input_data: Value,
}

/// Submit a job.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job queued", body = JobResponse),
        (status = 500, description = "Store unavailable", body = ErrorDetail)
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<JobResponse> {
    let job = state.job_service.create_job(request.input_data).await?;
    ok(job.into())
}

/// Get a job's status and result.
#[utoipa::path(
    get,
    path = "/jobs/{job_id}",
    tag = "jobs",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job found", body = JobResponse),
        (status = 404, description = "Job not found", body = ErrorDetail)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<JobResponse> {
    let job = state.job_service.get_job(&JobId::from(job_id)).await?;
    ok(job.into())
}

/// Get a job's event history.
#[utoipa::path(
    get,
    path = "/jobs/{job_id}/events",
    tag = "jobs",
    params(("job_id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Events, oldest first", body = JobEventsResponse),
        (status = 404, description = "No events recorded", body = ErrorDetail)
    )
)]
pub async fn get_job_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<JobEventsResponse> {
    let job_id = JobId::from(job_id);
    let events = state.job_service.get_events(&job_id).await?;
    ok(JobEventsResponse::new(&job_id, events))
}
