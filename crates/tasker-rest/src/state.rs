//! Application state for Axum handlers.

use std::sync::Arc;
use tasker_jobs::JobServiceInterface;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub job_service: Arc<dyn JobServiceInterface>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(job_service: Arc<dyn JobServiceInterface>) -> Self {
        Self { job_service }
    }
}
