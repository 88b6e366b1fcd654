//! # Tasker Server Library
//!
//! Wiring for the Tasker server: logging setup, the application that runs
//! the HTTP API next to the job worker, and startup output.

pub mod app;
pub mod logging;
pub mod startup;
