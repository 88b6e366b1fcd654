//! In-memory shared store (not persistent, for tests and local development).

use crate::error::{JobError, JobResult};
use crate::store::SharedStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Entry {
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Value {
        value: String,
        expires_at: Option<Instant>,
    },
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Entry::Value { expires_at: Some(at), .. } if *at <= now)
    }

    fn kind(&self) -> &'static str {
        match self {
            Entry::Hash(_) => "hash",
            Entry::List(_) => "list",
            Entry::Value { .. } => "string",
        }
    }
}

/// In-memory implementation of [`SharedStore`].
///
/// Clones share the same underlying data, so a store handed to a worker and
/// to a job service behaves like one Redis instance. Expiry uses
/// `tokio::time::Instant` and therefore follows a paused test clock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a live (non-expired) key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Value of a live plain key, such as a lock token.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.lock().get(key) {
            Some(Entry::Value { value, expires_at }) if !expires_at.is_some_and(|at| at <= now) => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Number of elements in a list, zero if absent.
    pub fn list_len(&self, key: &str) -> usize {
        match self.entries.lock().get(key) {
            Some(Entry::List(list)) => list.len(),
            _ => 0,
        }
    }

    fn wrong_type(key: &str, expected: &str, entry: &Entry) -> JobError {
        JobError::Backend(format!(
            "WRONGTYPE key '{}' holds a {}, expected {}",
            key,
            entry.kind(),
            expected
        ))
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl SharedStore for InMemoryStore {
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> JobResult<()> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));

        match entry {
            Entry::Hash(hash) => {
                for (field, value) in fields {
                    hash.insert(field.clone(), value.clone());
                }
                Ok(())
            }
            other => Err(Self::wrong_type(key, "hash", other)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> JobResult<Option<String>> {
        let entries = self.entries.lock();
        match entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(other) => Err(Self::wrong_type(key, "hash", other)),
        }
    }

    async fn hgetall(&self, key: &str) -> JobResult<HashMap<String, String>> {
        let entries = self.entries.lock();
        match entries.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(hash)) => Ok(hash.clone()),
            Some(other) => Err(Self::wrong_type(key, "hash", other)),
        }
    }

    async fn rpush(&self, key: &str, value: &str) -> JobResult<()> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));

        match entry {
            Entry::List(list) => {
                list.push_back(value.to_string());
                Ok(())
            }
            other => Err(Self::wrong_type(key, "list", other)),
        }
    }

    async fn lpop(&self, key: &str) -> JobResult<Option<String>> {
        let mut entries = self.entries.lock();
        let (value, drained) = match entries.get_mut(key) {
            None => return Ok(None),
            Some(Entry::List(list)) => (list.pop_front(), list.is_empty()),
            Some(other) => return Err(Self::wrong_type(key, "list", other)),
        };

        // Redis drops a list once its last element is popped.
        if drained {
            entries.remove(key);
        }

        Ok(value)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> JobResult<Vec<String>> {
        let entries = self.entries.lock();
        let list = match entries.get(key) {
            None => return Ok(Vec::new()),
            Some(Entry::List(list)) => list,
            Some(other) => return Err(Self::wrong_type(key, "list", other)),
        };

        let len = list.len() as isize;
        let normalize = |index: isize| if index < 0 { len + index } else { index };
        let start = normalize(start).max(0);
        let stop = normalize(stop).min(len - 1);

        if start > stop {
            return Ok(Vec::new());
        }

        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> JobResult<bool> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key);

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry::Value {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> JobResult<bool> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, key);
        Ok(entries.remove(key).is_some())
    }
}
