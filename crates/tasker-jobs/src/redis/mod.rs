//! Redis-backed shared store.

mod store;

pub use store::RedisStore;

use crate::config::RedisConfig;
use crate::error::{JobError, JobResult};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;

/// Create a Redis connection pool.
pub async fn create_pool(config: &RedisConfig) -> JobResult<Pool> {
    info!("Creating Redis connection pool for job engine...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| JobError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| JobError::Configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let mut conn = pool.get().await?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Key builder for the persisted layout.
///
/// With an empty prefix the keys are `job:{id}`, `lock:job:{id}`,
/// `event_log:{id}` and the queue name itself.
#[derive(Debug, Clone, Default)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn scoped(&self, key: String) -> String {
        if self.prefix.is_empty() {
            key
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    /// Queue list key.
    pub fn queue(&self, queue_name: &str) -> String {
        self.scoped(queue_name.to_string())
    }

    /// Job hash key.
    pub fn job(&self, job_id: &str) -> String {
        self.scoped(format!("job:{}", job_id))
    }

    /// Per-job lock key.
    pub fn lock(&self, job_id: &str) -> String {
        self.scoped(format!("lock:job:{}", job_id))
    }

    /// Per-job event list key.
    pub fn events(&self, job_id: &str) -> String {
        self.scoped(format!("event_log:{}", job_id))
    }
}
