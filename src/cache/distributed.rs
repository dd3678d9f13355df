//! cache::distributed
//!
//! Backend over a shared key-value store.
//!
//! Commits are stored as JSON under [`LastCommitKey::storage_key`] with the
//! store's own expiry, so every process sharing the store sees the same TTL
//! policy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{CacheError, LastCommitCache, LastCommitKey};
use crate::core::types::Commit;

/// A string key-value store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), CacheError>;
}

/// Last-commit cache on a [`KeyValueStore`].
#[derive(Clone)]
pub struct DistributedCache {
    store: Arc<dyn KeyValueStore>,
}

impl DistributedCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LastCommitCache for DistributedCache {
    fn name(&self) -> &'static str {
        "distributed"
    }

    async fn get(&self, key: &LastCommitKey) -> Result<Option<Commit>, CacheError> {
        match self.store.get(&key.storage_key()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &LastCommitKey,
        commit: &Commit,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let raw = serde_json::to_string(commit)?;
        self.store.set_with_ttl(&key.storage_key(), &raw, ttl).await
    }
}

/// In-process [`KeyValueStore`] with the same expiry semantics as Redis.
///
/// Clones share state, so several caches built over clones behave like
/// processes sharing one server.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::commit;

    fn key(path: &str) -> LastCommitKey {
        LastCommitKey::new("repo", "main", path)
    }

    #[tokio::test]
    async fn set_then_get_hits() {
        let cache = DistributedCache::new(Arc::new(MemoryStore::new()));

        cache
            .set(&key("a.txt"), &commit("abc"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get(&key("a.txt")).await.unwrap(), Some(commit("abc")));
    }

    #[tokio::test]
    async fn unset_key_misses() {
        let cache = DistributedCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.get(&key("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_misses() {
        let cache = DistributedCache::new(Arc::new(MemoryStore::new()));

        cache
            .set(&key("a.txt"), &commit("abc"), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get(&key("a.txt")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn caches_share_store() {
        let store = MemoryStore::new();
        let writer = DistributedCache::new(Arc::new(store.clone()));
        let reader = DistributedCache::new(Arc::new(store));

        writer
            .set(&key("a.txt"), &commit("abc"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(reader.get(&key("a.txt")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_value_is_serialization_error() {
        let store = MemoryStore::new();
        store
            .set_with_ttl(&key("a.txt").storage_key(), "not json", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = DistributedCache::new(Arc::new(store));

        let err = cache.get(&key("a.txt")).await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
