//! Configuration validation module.
//!
//! Fails fast on invalid configuration rather than at runtime. Settings that
//! work but are probably mistakes come back as warnings.

use crate::AppConfig;
use std::fmt;
use tasker_jobs::{JobsConfig, RetryPolicy};
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A required name is empty.
    EmptyValue { name: String },
    /// Retry attempts must be at least one.
    InvalidMaxAttempts { value: u32 },
    /// Backoff multiplier below 1.0 would shrink delays.
    InvalidMultiplier { value: f64 },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Pool size must be positive.
    InvalidPoolSize { value: usize },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::EmptyValue { name } => write!(f, "{} cannot be empty", name),
            Self::InvalidMaxAttempts { value } => {
                write!(f, "Invalid retry max_attempts: {} (must be at least 1)", value)
            }
            Self::InvalidMultiplier { value } => {
                write!(f, "Invalid retry multiplier: {} (must be at least 1.0)", value)
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout {} must be positive, got {}", name, value)
            }
            Self::InvalidPoolSize { value } => {
                write!(f, "Invalid Redis pool size: {} (must be at least 1)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Non-fatal configuration findings.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// A crashed holder's lock could expire before the job's backoffs finish.
    LockTtlBelowBackoff { lock_ttl_secs: u64, backoff_secs: u64 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockTtlBelowBackoff {
                lock_ttl_secs,
                backoff_secs,
            } => write!(
                f,
                "Lock TTL ({}s) is shorter than the total retry backoff ({}s); \
                 a job could be picked up twice",
                lock_ttl_secs, backoff_secs
            ),
        }
    }
}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
    warnings: Vec<ConfigWarning>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    fn add_warning(&mut self, warning: ConfigWarning) {
        self.warnings.push(warning);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Returns the warnings.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire application configuration.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(&config.server, &mut result);
        Self::validate_jobs(&config.jobs, &mut result);

        result
    }

    /// Validates server configuration.
    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "server.request_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    /// Validates the job engine configuration.
    fn validate_jobs(config: &JobsConfig, result: &mut ValidationResult) {
        let url = &config.redis.url;
        if url.is_empty() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !url.starts_with("redis://")
            && !url.starts_with("rediss://")
            && !url.starts_with("redis+unix://")
        {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis://, rediss:// or redis+unix://".to_string(),
            });
        } else if let Err(e) = Url::parse(url) {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            });
        }

        if config.redis.pool_size == 0 {
            result.add_error(ConfigValidationError::InvalidPoolSize { value: 0 });
        }

        if config.worker.queue_name.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyValue {
                name: "jobs.worker.queue_name".to_string(),
            });
        }

        if config.worker.lock_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "jobs.worker.lock_ttl_secs".to_string(),
                value: 0,
            });
        }

        if config.retry.max_attempts < 1 {
            result.add_error(ConfigValidationError::InvalidMaxAttempts {
                value: config.retry.max_attempts,
            });
        }

        if config.retry.multiplier.is_nan() || config.retry.multiplier < 1.0 {
            result.add_error(ConfigValidationError::InvalidMultiplier {
                value: config.retry.multiplier,
            });
        }

        let backoff = RetryPolicy::from(&config.retry).total_backoff();
        if config.worker.lock_ttl() < backoff {
            result.add_warning(ConfigWarning::LockTtlBelowBackoff {
                lock_ttl_secs: config.worker.lock_ttl_secs,
                backoff_secs: backoff.as_secs(),
            });
        }
    }
}

/// Formats validation errors into a human-readable string.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
