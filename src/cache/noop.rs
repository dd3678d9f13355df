//! cache::noop

use async_trait::async_trait;
use std::time::Duration;

use super::{CacheError, LastCommitCache, LastCommitKey};
use crate::core::types::Commit;

/// Backend used when caching is disabled: every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl LastCommitCache for DisabledCache {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &LastCommitKey) -> Result<Option<Commit>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &LastCommitKey,
        _commit: &Commit,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::commit;

    #[tokio::test]
    async fn set_then_get_misses() {
        let cache = DisabledCache;
        let key = LastCommitKey::new("repo", "main", "a.txt");

        cache
            .set(&key, &commit("abc"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }
}
