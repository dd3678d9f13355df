//! cache::redis
//!
//! Redis-backed [`KeyValueStore`] on a deadpool connection pool, either
//! against a single server or a master resolved through Redis Sentinel.
//!
//! Pools connect lazily, so building a store never touches the network.
//! Sentinel pools cannot pass credentials on to the resolved master, so
//! sentinel mode runs without a password.
//! Failed commands are retried up to `max_retries` times with exponential
//! backoff before the error is returned.

use async_trait::async_trait;
use deadpool_redis::redis::{self, FromRedisValue};
use deadpool_redis::sentinel::{self, SentinelServerType};
use deadpool_redis::{ConnectionAddr, ConnectionInfo, PoolConfig, RedisConnectionInfo, Runtime};
use std::time::Duration;
use tracing::warn;

use super::{CacheError, KeyValueStore};
use crate::core::config::{ConfigError, RedisConfig};

const DEFAULT_PORT: u16 = 6379;
const MIN_BACKOFF: Duration = Duration::from_millis(8);
const MAX_BACKOFF: Duration = Duration::from_millis(512);

enum RedisPool {
    Standalone(deadpool_redis::Pool),
    Sentinel(sentinel::Pool),
}

/// Key-value store on Redis.
pub struct RedisStore {
    pool: RedisPool,
    max_retries: u32,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.pool {
            RedisPool::Standalone(_) => "standalone",
            RedisPool::Sentinel(_) => "sentinel",
        };
        f.debug_struct("RedisStore")
            .field("mode", &mode)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RedisStore {
    /// Build a pool from Redis settings, validating them first.
    pub fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        config.validate()?;

        let pool = if config.sentinel_mode {
            let urls = config
                .sentinel_endpoints()
                .into_iter()
                .map(redis_url)
                .collect::<Vec<_>>();
            let mut cfg = sentinel::Config::from_urls(
                urls,
                config.sentinel_master.clone(),
                SentinelServerType::Master,
            );
            cfg.pool = Some(pool_config(config));
            let pool = cfg
                .create_pool(Some(Runtime::Tokio1))
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            RedisPool::Sentinel(pool)
        } else {
            let mut cfg = standalone_config(config)?;
            cfg.pool = Some(pool_config(config));
            let pool = cfg
                .create_pool(Some(Runtime::Tokio1))
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            RedisPool::Standalone(pool)
        };

        Ok(Self {
            pool,
            max_retries: config.max_retries,
        })
    }

    async fn query<T>(&self, cmd: &redis::Cmd) -> Result<T, CacheError>
    where
        T: FromRedisValue + Send,
    {
        let mut attempt = 0;
        loop {
            match self.query_once(cmd).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries => {
                    let delay = backoff(attempt);
                    warn!(attempt, error = %err, ?delay, "redis command failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn query_once<T>(&self, cmd: &redis::Cmd) -> Result<T, CacheError>
    where
        T: FromRedisValue + Send,
    {
        match &self.pool {
            RedisPool::Standalone(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                cmd.query_async(&mut conn)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))
            }
            RedisPool::Sentinel(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                cmd.query_async(&mut conn)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        // PX rejects 0; round sub-millisecond TTLs up.
        let millis = ttl.as_millis().clamp(1, u64::MAX as u128) as u64;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("PX").arg(millis);
        self.query::<()>(&cmd).await
    }
}

/// Pool settings for a single server.
///
/// `host:port` endpoints go through structured connection info so the
/// password is passed as is, whatever characters it contains.
fn standalone_config(config: &RedisConfig) -> Result<deadpool_redis::Config, CacheError> {
    if config.endpoint.contains("://") {
        return Ok(deadpool_redis::Config::from_url(config.endpoint.clone()));
    }
    let (host, port) = tcp_addr(&config.endpoint)?;
    Ok(deadpool_redis::Config::from_connection_info(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            password: config.password.clone(),
            ..Default::default()
        },
    }))
}

/// Split `host[:port]`, accepting bracketed IPv6 hosts.
fn tcp_addr(endpoint: &str) -> Result<(String, u16), CacheError> {
    let invalid = || {
        CacheError::Config(ConfigError::InvalidValue(format!(
            "redis.endpoint '{}' is not host:port",
            endpoint
        )))
    };

    let (host, port) = match endpoint.strip_prefix('[') {
        Some(rest) => {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if tail.is_empty() => (host, None),
                None => return Err(invalid()),
            }
        }
        None => match endpoint.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (endpoint, None),
        },
    };
    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(port) => port.parse().map_err(|_| invalid())?,
        None => DEFAULT_PORT,
    };
    Ok((host.to_string(), port))
}

fn redis_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("redis://{}", endpoint)
    }
}

fn pool_config(config: &RedisConfig) -> PoolConfig {
    let defaults = PoolConfig::default();
    // deadpool has no idle floor; make sure the pool can hold at least that many.
    PoolConfig::new(defaults.max_size.max(config.min_idle_connections as usize))
}

fn backoff(attempt: u32) -> Duration {
    MIN_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_gets_scheme() {
        assert_eq!(redis_url("localhost:6379"), "redis://localhost:6379");
        assert_eq!(redis_url("rediss://cache:6380"), "rediss://cache:6380");
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff(0), Duration::from_millis(8));
        assert_eq!(backoff(1), Duration::from_millis(16));
        assert_eq!(backoff(10), MAX_BACKOFF);
        assert_eq!(backoff(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn pool_size_respects_idle_floor() {
        let config = RedisConfig {
            min_idle_connections: 10_000,
            ..Default::default()
        };
        assert_eq!(pool_config(&config).max_size, 10_000);
    }

    #[tokio::test]
    async fn connect_is_lazy() {
        let store = RedisStore::connect(&RedisConfig {
            endpoint: "127.0.0.1:1".to_string(),
            ..Default::default()
        });
        assert!(store.is_ok());
    }

    #[test]
    fn endpoint_splits_into_host_and_port() {
        assert_eq!(tcp_addr("cache:6380").unwrap(), ("cache".to_string(), 6380));
        assert_eq!(tcp_addr("cache").unwrap(), ("cache".to_string(), 6379));
        assert_eq!(tcp_addr("[::1]:7000").unwrap(), ("::1".to_string(), 7000));
        assert_eq!(tcp_addr("[::1]").unwrap(), ("::1".to_string(), 6379));
        for bad in ["cache:port", ":6379", "[::1", "[::1]x", "cache:70000"] {
            assert!(
                matches!(tcp_addr(bad), Err(CacheError::Config(_))),
                "endpoint {:?}",
                bad
            );
        }
    }

    #[test]
    fn password_passed_verbatim() {
        let password = "p@ss/word#1:?";
        let cfg = standalone_config(&RedisConfig {
            endpoint: "cache.internal:6380".to_string(),
            password: Some(password.to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(cfg.url.is_none());
        let info = cfg.connection.unwrap();
        assert!(matches!(&info.addr, ConnectionAddr::Tcp(host, 6380) if host == "cache.internal"));
        assert_eq!(info.redis.password.as_deref(), Some(password));
    }

    #[tokio::test]
    async fn connect_with_awkward_password_is_lazy() {
        let store = RedisStore::connect(&RedisConfig {
            endpoint: "127.0.0.1:6379".to_string(),
            password: Some("p@ss/word#1".to_string()),
            ..Default::default()
        });
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn sentinel_connect_is_lazy() {
        let store = RedisStore::connect(&RedisConfig {
            sentinel_mode: true,
            sentinel_master: "mymaster".to_string(),
            sentinel_endpoint: "127.0.0.1:1, 127.0.0.1:2".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(format!("{:?}", store).contains("sentinel"));
    }

    #[tokio::test]
    async fn sentinel_with_password_rejected() {
        let store = RedisStore::connect(&RedisConfig {
            sentinel_mode: true,
            sentinel_master: "mymaster".to_string(),
            sentinel_endpoint: "127.0.0.1:1".to_string(),
            password: Some("secret".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            store,
            Err(CacheError::Config(ConfigError::InvalidValue(_)))
        ));
    }
}
