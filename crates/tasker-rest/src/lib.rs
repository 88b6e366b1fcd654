//! # Tasker REST
//!
//! REST API layer using Axum for Tasker.
//! Provides HTTP endpoints for job submission, status, event history and
//! health checks.

pub mod controllers;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
