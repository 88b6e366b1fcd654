//! Shared store abstraction.
//!
//! The job engine only needs a handful of hash, list and key operations.
//! Keeping them behind a trait lets production run on Redis while tests use
//! [`InMemoryStore`](crate::memory::InMemoryStore).

use crate::error::JobResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Key-value and list store shared by every worker process.
///
/// Only [`lpop`](SharedStore::lpop) and [`set_nx_ex`](SharedStore::set_nx_ex)
/// must be atomic; everything else may interleave.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Set several fields of a hash.
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> JobResult<()>;

    /// Get one field of a hash.
    async fn hget(&self, key: &str, field: &str) -> JobResult<Option<String>>;

    /// Get all fields of a hash. Empty map if the key does not exist.
    async fn hgetall(&self, key: &str) -> JobResult<HashMap<String, String>>;

    /// Append to the tail of a list.
    async fn rpush(&self, key: &str, value: &str) -> JobResult<()>;

    /// Remove and return the head of a list. Never blocks.
    async fn lpop(&self, key: &str) -> JobResult<Option<String>>;

    /// Read a range of a list; negative indices count from the tail.
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> JobResult<Vec<String>>;

    /// Atomically set `key` to `value` with an expiry, only if absent.
    ///
    /// Returns true if the key was set.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> JobResult<bool>;

    /// Delete a key. Returns true if it existed.
    async fn del(&self, key: &str) -> JobResult<bool>;
}
