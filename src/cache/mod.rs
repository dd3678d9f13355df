//! cache
//!
//! Last-commit cache: (repository, ref, path) to the most recent commit
//! touching that path.
//!
//! # Backends
//!
//! - [`DisabledCache`] - always misses
//! - [`LocalCache`] - process-private, bounded, per-entry TTL (moka)
//! - [`DistributedCache`] - shared key-value store (Redis in production)
//!
//! The backend is chosen once at startup by [`create_cache`] and used as an
//! `Arc<dyn LastCommitCache>`. Every backend is safe for concurrent use and
//! expires entries after the TTL given to `set`. Hits may be stale until
//! then.
//!
//! # Example
//!
//! ```
//! use gitread::cache::{create_cache, LastCommitKey};
//! use gitread::core::config::{LastCommitCacheConfig, RedisConfig};
//!
//! # tokio_test::block_on(async {
//! let cache = create_cache(&LastCommitCacheConfig::default(), &RedisConfig::default()).unwrap();
//! assert_eq!(cache.name(), "local");
//!
//! let key = LastCommitKey::new("repo", "main", "README.md");
//! assert!(cache.get(&key).await.unwrap().is_none());
//! # });
//! ```

mod distributed;
mod factory;
mod local;
mod noop;
mod redis;

pub use distributed::{DistributedCache, KeyValueStore, MemoryStore};
pub use factory::create_cache;
pub use local::LocalCache;
pub use noop::DisabledCache;
pub use redis::RedisStore;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::types::Commit;

/// Prefix of every key written to a shared store.
pub const KEY_PREFIX: &str = "gitread:last-commit:";

/// Errors from cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("failed to encode cached commit: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Identifies the last commit touching `path` as seen from `git_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LastCommitKey {
    pub repo_uid: String,
    pub git_ref: String,
    pub path: String,
}

impl LastCommitKey {
    pub fn new(
        repo_uid: impl Into<String>,
        git_ref: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            repo_uid: repo_uid.into(),
            git_ref: git_ref.into(),
            path: path.into(),
        }
    }

    /// Fixed-length key for shared stores.
    ///
    /// The parts are NUL-separated before hashing so that no two distinct
    /// keys collide by concatenation.
    pub fn storage_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.repo_uid.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.git_ref.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.path.as_bytes());
        format!("{}{}", KEY_PREFIX, hex::encode(hasher.finalize()))
    }
}

/// A last-commit cache backend.
#[async_trait]
pub trait LastCommitCache: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Look up a key. `Ok(None)` is a miss.
    async fn get(&self, key: &LastCommitKey) -> Result<Option<Commit>, CacheError>;

    /// Store a commit for `ttl`. A zero TTL stores nothing.
    async fn set(&self, key: &LastCommitKey, commit: &Commit, ttl: Duration)
        -> Result<(), CacheError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_is_prefixed_and_fixed_length() {
        let key = LastCommitKey::new("repo", "main", "README.md").storage_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn storage_key_separates_parts() {
        let a = LastCommitKey::new("ab", "c", "d").storage_key();
        let b = LastCommitKey::new("a", "bc", "d").storage_key();
        assert_ne!(a, b);
    }

    #[test]
    fn storage_key_is_stable() {
        let a = LastCommitKey::new("repo", "main", "src").storage_key();
        let b = LastCommitKey::new("repo", "main", "src").storage_key();
        assert_eq!(a, b);
    }
}
