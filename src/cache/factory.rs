//! cache::factory
//!
//! Select the last-commit cache backend from configuration.

use std::sync::Arc;
use tracing::info;

use super::{
    CacheError, DisabledCache, DistributedCache, LastCommitCache, LocalCache, RedisStore,
};
use crate::core::config::{CacheMode, LastCommitCacheConfig, RedisConfig};

/// Create the configured cache backend.
///
/// `redis` is only consulted for the distributed mode.
///
/// # Errors
///
/// Returns an error if the mode is unknown, the settings are invalid, or
/// the Redis pool cannot be built.
pub fn create_cache(
    config: &LastCommitCacheConfig,
    redis: &RedisConfig,
) -> Result<Arc<dyn LastCommitCache>, CacheError> {
    config.validate()?;

    let cache: Arc<dyn LastCommitCache> = match config.cache_mode()? {
        CacheMode::Disabled => Arc::new(DisabledCache),
        CacheMode::Local => Arc::new(LocalCache::new(config.max_entries)),
        CacheMode::Distributed => {
            redis.validate()?;
            let store = RedisStore::connect(redis)?;
            Arc::new(DistributedCache::new(Arc::new(store)))
        }
    };

    info!(
        backend = cache.name(),
        ttl_secs = config.duration_seconds,
        "last commit cache ready"
    );
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(mode: &str) -> LastCommitCacheConfig {
        LastCommitCacheConfig {
            mode: mode.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn selects_backend_by_mode() {
        let redis = RedisConfig::default();
        assert_eq!(create_cache(&mode("disabled"), &redis).unwrap().name(), "disabled");
        assert_eq!(create_cache(&mode("local"), &redis).unwrap().name(), "local");
        assert_eq!(create_cache(&mode(""), &redis).unwrap().name(), "local");
    }

    #[test]
    fn legacy_aliases() {
        let redis = RedisConfig::default();
        assert_eq!(create_cache(&mode("none"), &redis).unwrap().name(), "disabled");
        assert_eq!(create_cache(&mode("inmemory"), &redis).unwrap().name(), "local");
    }

    #[tokio::test]
    async fn distributed_builds_lazily() {
        let cache = create_cache(&mode("distributed"), &RedisConfig::default()).unwrap();
        assert_eq!(cache.name(), "distributed");
    }

    #[test]
    fn unknown_mode_rejected() {
        let result = create_cache(&mode("memcached"), &RedisConfig::default());
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn sentinel_without_master_rejected() {
        let redis = RedisConfig {
            sentinel_mode: true,
            sentinel_endpoint: "localhost:26379".to_string(),
            ..Default::default()
        };
        let result = create_cache(&mode("distributed"), &redis);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
