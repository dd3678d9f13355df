//! cache::local
//!
//! Process-private backend on a bounded moka cache.
//!
//! Each entry carries its own TTL (moka `Expiry`), and `get` also checks the
//! stored deadline so an expired entry is never returned even if moka has
//! not evicted it yet.

use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CacheError, LastCommitCache, LastCommitKey};
use crate::core::types::Commit;

#[derive(Debug, Clone)]
struct Entry {
    commit: Commit,
    ttl: Duration,
    expires_at: Instant,
}

struct EntryExpiry;

impl Expiry<LastCommitKey, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &LastCommitKey,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &LastCommitKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory last-commit cache.
#[derive(Clone)]
pub struct LocalCache {
    entries: Cache<LastCommitKey, Entry>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl LocalCache {
    /// Create a cache holding at most `max_entries` commits.
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self { entries }
    }
}

#[async_trait]
impl LastCommitCache for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &LastCommitKey) -> Result<Option<Commit>, CacheError> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.commit)),
            Some(_) => {
                debug!(repo = %key.repo_uid, path = %key.path, "dropping expired entry");
                self.entries.invalidate(key);
                Ok(None)
            }
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
        let entry = Entry {
            commit: commit.clone(),
            ttl,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.clone(), entry);
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
        let cache = LocalCache::new(100);

        cache
            .set(&key("a.txt"), &commit("abc"), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get(&key("a.txt")).await.unwrap();
        assert_eq!(hit.unwrap().sha, "abc");
    }

    #[tokio::test]
    async fn unset_key_misses() {
        let cache = LocalCache::new(100);
        assert!(cache.get(&key("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_misses() {
        let cache = LocalCache::new(100);

        cache
            .set(&key("a.txt"), &commit("abc"), Duration::from_millis(20))
            .await
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(cache.get(&key("a.txt")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_ttl_stores_nothing() {
        let cache = LocalCache::new(100);

        cache
            .set(&key("a.txt"), &commit("abc"), Duration::ZERO)
            .await
            .unwrap();

        assert!(cache.get(&key("a.txt")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let cache = LocalCache::new(100);
        let ttl = Duration::from_secs(60);

        cache.set(&key("a.txt"), &commit("old"), ttl).await.unwrap();
        cache.set(&key("a.txt"), &commit("new"), ttl).await.unwrap();

        assert_eq!(cache.get(&key("a.txt")).await.unwrap().unwrap().sha, "new");
    }

    #[tokio::test]
    async fn concurrent_access() {
        let cache = LocalCache::new(1_000);
        let ttl = Duration::from_secs(60);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for j in 0..50 {
                        let k = key(&format!("{}/{}", i, j));
                        cache.set(&k, &commit("abc"), ttl).await.unwrap();
                        assert!(cache.get(&k).await.unwrap().is_some());
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
    }
}
