//! Job engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the job engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Redis connection configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Worker loop configuration.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Retry and backoff configuration.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Built-in executor configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Optional prefix for every key. Empty keeps the bare
    /// `job:{id}` / `job_queue` layout.
    #[serde(default)]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            key_prefix: String::new(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_pool_size() -> usize {
    10
}

/// Worker loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Queue the worker pulls job IDs from.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    /// Sleep between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Per-job lock TTL in seconds. Bounds crash recovery only.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// How long shutdown waits for the worker to stop, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            poll_interval_ms: default_poll_interval(),
            lock_ttl_secs: default_lock_ttl(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// Default queue name.
pub const DEFAULT_QUEUE: &str = "job_queue";

fn default_queue_name() -> String {
    DEFAULT_QUEUE.to_string()
}

fn default_poll_interval() -> u64 {
    100 // 100ms
}

fn default_lock_ttl() -> u64 {
    60
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl WorkerConfig {
    /// Returns poll interval as Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns lock TTL as Duration.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Returns shutdown timeout as Duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per job, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff after the first failed attempt, in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Maximum backoff in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    1000 // 1 second
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff() -> u64 {
    300_000 // 5 minutes
}

/// Configuration of the built-in simulated executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Simulated work duration in milliseconds.
    #[serde(default = "default_simulated_work")]
    pub simulated_work_ms: u64,

    /// If set, jobs whose `input_data` has this key set to `true` fail.
    #[serde(default)]
    pub fail_on_key: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            simulated_work_ms: default_simulated_work(),
            fail_on_key: None,
        }
    }
}

fn default_simulated_work() -> u64 {
    10_000
}

impl ExecutorConfig {
    /// Returns the simulated work duration.
    pub fn simulated_work(&self) -> Duration {
        Duration::from_millis(self.simulated_work_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobsConfig::default();
        assert_eq!(config.redis.url, "redis://localhost:6379/0");
        assert!(config.redis.key_prefix.is_empty());
        assert_eq!(config.worker.queue_name, "job_queue");
        assert_eq!(config.worker.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.worker.lock_ttl(), Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.executor.simulated_work(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: JobsConfig =
            serde_json::from_str(r#"{"worker": {"lock_ttl_secs": 5}}"#).unwrap();
        assert_eq!(config.worker.lock_ttl_secs, 5);
        assert_eq!(config.worker.poll_interval_ms, 100);
        assert_eq!(config.retry.multiplier, 2.0);
    }
}
