//! Configuration errors.

use crate::validation::{format_validation_errors, ConfigValidationError};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the schema.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Loaded values failed validation.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}
