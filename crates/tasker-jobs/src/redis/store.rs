//! Redis implementation of the shared store.

use crate::error::JobResult;
use crate::store::SharedStore;
use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Shared store backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create a new Redis store.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> JobResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> JobResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> JobResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hgetall(&self, key: &str) -> JobResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn rpush(&self, key: &str, value: &str) -> JobResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn lpop(&self, key: &str) -> JobResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.lpop(key, None).await?)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> JobResult<Vec<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.lrange(key, start, stop).await?)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> JobResult<bool> {
        let mut conn = self.conn().await?;
        let ttl_secs = ttl.as_secs().max(1);

        // Check-and-set must stay one command.
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut *conn)
            .await?;

        debug!(key = %key, acquired = result.is_some(), ttl_secs, "SET NX EX");
        Ok(result.is_some())
    }

    async fn del(&self, key: &str) -> JobResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }
}
