//! Cache tier.
//!
//! The cache is shared by every engine instance. Besides plain key/value
//! entries it supports atomic set-if-absent with a TTL (used for locks) and
//! ordered string lists (used for adjacency lists).

use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A shared cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Stores a value, replacing whatever was at the key.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> StorageResult<()>;

    /// Stores a value only if the key is absent. Returns whether it was stored.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;

    /// Removes a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Index of `member` in the list at `key`; `None` if absent or no list.
    async fn list_position(&self, key: &str, member: &str) -> StorageResult<Option<usize>>;

    /// Appends members to the list at `key`, creating it. Returns the new length.
    async fn list_append(&self, key: &str, members: &[String]) -> StorageResult<usize>;

    /// Removes every occurrence of `member`. Returns how many were removed.
    async fn list_remove(&self, key: &str, member: &str) -> StorageResult<usize>;

    /// The whole list in insertion order; empty if the key is absent.
    async fn list_range(&self, key: &str) -> StorageResult<Vec<String>>;

    async fn quit(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum CacheValue {
    Scalar(Value),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process [`CacheStore`].
///
/// Expiry is lazy: an expired entry is dropped the next time it is touched.
/// Uses `tokio::time::Instant` so tests with a paused clock control TTLs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry, simulating a cold or flushed cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drops a single entry, simulating eviction.
    pub fn evict(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the live entry at `key`, purging it first if expired.
    fn with_live<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, CacheEntry>) -> T,
    ) -> T {
        let mut entries = self.lock();
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        f(&mut entries)
    }
}

fn deadline(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|ttl| Instant::now() + ttl)
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(CacheEntry {
                value: CacheValue::Scalar(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(StorageError::WrongType(key.to_string())),
        })
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> StorageResult<()> {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                value: CacheValue::Scalar(value),
                expires_at: deadline(ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        self.with_live(key, |entries| {
            if entries.contains_key(key) {
                return Ok(false);
            }
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value: CacheValue::Scalar(value),
                    expires_at: deadline(ttl),
                },
            );
            Ok(true)
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.with_live(key, |entries| Ok(entries.remove(key).is_some()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.with_live(key, |entries| Ok(entries.contains_key(key)))
    }

    async fn list_position(&self, key: &str, member: &str) -> StorageResult<Option<usize>> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(CacheEntry {
                value: CacheValue::List(list),
                ..
            }) => Ok(list.iter().position(|m| m == member)),
            Some(_) => Err(StorageError::WrongType(key.to_string())),
        })
    }

    async fn list_append(&self, key: &str, members: &[String]) -> StorageResult<usize> {
        self.with_live(key, |entries| {
            if members.is_empty() {
                return match entries.get(key) {
                    None => Ok(0),
                    Some(CacheEntry {
                        value: CacheValue::List(list),
                        ..
                    }) => Ok(list.len()),
                    Some(_) => Err(StorageError::WrongType(key.to_string())),
                };
            }
            let entry = entries.entry(key.to_string()).or_insert_with(|| CacheEntry {
                value: CacheValue::List(Vec::new()),
                expires_at: None,
            });
            match &mut entry.value {
                CacheValue::List(list) => {
                    list.extend(members.iter().cloned());
                    Ok(list.len())
                }
                CacheValue::Scalar(_) => Err(StorageError::WrongType(key.to_string())),
            }
        })
    }

    async fn list_remove(&self, key: &str, member: &str) -> StorageResult<usize> {
        self.with_live(key, |entries| {
            let (removed, now_empty) = match entries.get_mut(key) {
                None => return Ok(0),
                Some(CacheEntry {
                    value: CacheValue::List(list),
                    ..
                }) => {
                    let before = list.len();
                    list.retain(|m| m != member);
                    (before - list.len(), list.is_empty())
                }
                Some(_) => return Err(StorageError::WrongType(key.to_string())),
            };
            // An emptied list ceases to exist.
            if now_empty {
                entries.remove(key);
            }
            Ok(removed)
        })
    }

    async fn list_range(&self, key: &str) -> StorageResult<Vec<String>> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(CacheEntry {
                value: CacheValue::List(list),
                ..
            }) => Ok(list.clone()),
            Some(_) => Err(StorageError::WrongType(key.to_string())),
        })
    }
}
