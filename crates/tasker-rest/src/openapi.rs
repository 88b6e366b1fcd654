//! OpenAPI documentation configuration.

use crate::controllers::health_controller::HealthResponse;
use crate::controllers::jobs_controller::CreateJobRequest;
use crate::responses::{ErrorDetail, EventResponse, JobEventsResponse, JobResponse};
use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

/// OpenAPI documentation for the Tasker API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tasker API",
        description = "Submit jobs and follow their execution",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        crate::controllers::jobs_controller::create_job,
        crate::controllers::jobs_controller::get_job,
        crate::controllers::jobs_controller::get_job_events,
        crate::controllers::health_controller::health_check,
    ),
    components(schemas(
        CreateJobRequest,
        JobResponse,
        EventResponse,
        JobEventsResponse,
        ErrorDetail,
        HealthResponse,
    )),
    tags(
        (name = "jobs", description = "Job submission and status"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document as JSON.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
