//! # Tasker Config
//!
//! Configuration management for Tasker.
//! Supports layered configuration from files, `.env`, environment variables,
//! and runtime refresh.

mod app_config;
mod error;
mod loader;
mod validation;

pub use app_config::*;
pub use error::*;
pub use loader::*;
pub use validation::*;
