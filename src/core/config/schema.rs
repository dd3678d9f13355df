//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! port = 3001
//! git_root = "/var/lib/gitread/repos"
//! git_hook_path = "/usr/local/bin/gitread-hook"
//! max_conn_age_secs = 3600
//! max_conn_age_grace_secs = 60
//!
//! [http]
//! port = 4001
//!
//! [last_commit_cache]
//! mode = "distributed"
//! duration_seconds = 43200
//!
//! [redis]
//! endpoint = "redis.internal:6379"
//! max_retries = 3
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing and after environment overrides are
//! applied. A config that fails validation prevents startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Default cache TTL: half a day.
pub const DEFAULT_CACHE_SECONDS: u64 = 43_200;

/// Default connection age limits (20 years, i.e. effectively unbounded).
pub const DEFAULT_CONN_AGE_SECS: u64 = 630_720_000;

/// Where the last-commit cache lives.
///
/// Parsed once from [`LastCommitCacheConfig::mode`]; the rest of the service
/// only ever sees this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Every lookup misses.
    Disabled,
    /// Process-private cache.
    #[default]
    Local,
    /// Shared cache in Redis, visible to every service instance.
    Distributed,
}

impl CacheMode {
    /// Canonical mode names.
    pub const VALID_NAMES: &'static [&'static str] = &["disabled", "local", "distributed"];
}

impl FromStr for CacheMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" | "none" => Ok(CacheMode::Disabled),
            "local" | "inmemory" => Ok(CacheMode::Local),
            "distributed" | "redis" => Ok(CacheMode::Distributed),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid last_commit_cache.mode '{}', must be one of: {}",
                other,
                Self::VALID_NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Disabled => write!(f, "disabled"),
            CacheMode::Local => write!(f, "local"),
            CacheMode::Distributed => write!(f, "distributed"),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port the read service binds to.
    pub port: u16,

    /// Directory containing the repositories.
    pub git_root: PathBuf,

    /// Directory for temporary data (optional).
    pub tmp_dir: Option<PathBuf>,

    /// Binary used as git server hook.
    pub git_hook_path: PathBuf,

    pub http: HttpConfig,

    /// Maximum lifetime of a client connection.
    pub max_conn_age_secs: u64,

    /// Grace period after `max_conn_age_secs` before the connection is closed.
    pub max_conn_age_grace_secs: u64,

    pub last_commit_cache: LastCommitCacheConfig,

    pub redis: RedisConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            git_root: PathBuf::new(),
            tmp_dir: None,
            git_hook_path: PathBuf::new(),
            http: HttpConfig::default(),
            max_conn_age_secs: DEFAULT_CONN_AGE_SECS,
            max_conn_age_grace_secs: DEFAULT_CONN_AGE_SECS,
            last_commit_cache: LastCommitCacheConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for required settings that are unset and
    /// `ConfigError::InvalidValue` for values outside their allowed set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Missing("port"));
        }
        if self.git_root.as_os_str().is_empty() {
            return Err(ConfigError::Missing("git_root"));
        }
        if self.git_hook_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("git_hook_path"));
        }
        if self.max_conn_age_secs == 0 {
            return Err(ConfigError::Missing("max_conn_age_secs"));
        }
        if self.max_conn_age_grace_secs == 0 {
            return Err(ConfigError::Missing("max_conn_age_grace_secs"));
        }

        self.last_commit_cache.validate()?;
        if self.last_commit_cache.cache_mode()? == CacheMode::Distributed {
            self.redis.validate()?;
        }

        Ok(())
    }

    pub fn max_conn_age(&self) -> Duration {
        Duration::from_secs(self.max_conn_age_secs)
    }

    pub fn max_conn_age_grace(&self) -> Duration {
        Duration::from_secs(self.max_conn_age_grace_secs)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: 4001 }
    }
}

/// Last-commit cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LastCommitCacheConfig {
    /// One of "disabled", "local" or "distributed". Empty selects the default.
    pub mode: String,

    /// How long an entry stays valid, in seconds.
    pub duration_seconds: u64,

    /// Upper bound on entries held by the local backend.
    pub max_entries: u64,
}

impl Default for LastCommitCacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::default().to_string(),
            duration_seconds: DEFAULT_CACHE_SECONDS,
            max_entries: 10_000,
        }
    }
}

impl LastCommitCacheConfig {
    /// Resolve the configured mode.
    pub fn cache_mode(&self) -> Result<CacheMode, ConfigError> {
        if self.mode.is_empty() {
            return Ok(CacheMode::default());
        }
        self.mode.parse()
    }

    /// The entry TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mode = self.cache_mode()?;
        if mode != CacheMode::Disabled && self.duration_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "last_commit_cache.duration_seconds must be positive".to_string(),
            ));
        }
        if mode == CacheMode::Local && self.max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "last_commit_cache.max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Redis connection settings for the distributed cache backend.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub endpoint: String,

    /// Attempts per command after the first failure.
    pub max_retries: u32,

    /// Connections kept open while idle.
    pub min_idle_connections: u32,

    pub password: Option<String>,

    /// Resolve the master through Redis Sentinel.
    pub sentinel_mode: bool,

    pub sentinel_master: String,

    /// Comma separated `host:port` list of sentinels.
    pub sentinel_endpoint: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:6379".to_string(),
            max_retries: 3,
            min_idle_connections: 0,
            password: None,
            sentinel_mode: false,
            sentinel_master: String::new(),
            sentinel_endpoint: String::new(),
        }
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("min_idle_connections", &self.min_idle_connections)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("sentinel_mode", &self.sentinel_mode)
            .field("sentinel_master", &self.sentinel_master)
            .field("sentinel_endpoint", &self.sentinel_endpoint)
            .finish()
    }
}

impl RedisConfig {
    /// Validate the Redis settings.
    ///
    /// A password cannot be combined with sentinel mode: the pool has no way
    /// to hand credentials to the master it resolves. It also cannot be
    /// combined with a URL endpoint, which carries its own credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sentinel_mode {
            if self.sentinel_master.is_empty() {
                return Err(ConfigError::Missing("redis.sentinel_master"));
            }
            if self.sentinel_endpoints().is_empty() {
                return Err(ConfigError::Missing("redis.sentinel_endpoint"));
            }
            if self.password.is_some() {
                return Err(ConfigError::InvalidValue(
                    "redis.password is not supported with redis.sentinel_mode".to_string(),
                ));
            }
        } else if self.endpoint.is_empty() {
            return Err(ConfigError::Missing("redis.endpoint"));
        } else if self.endpoint.contains("://") && self.password.is_some() {
            return Err(ConfigError::InvalidValue(
                "redis.password cannot be used with a URL endpoint; put it in the URL".to_string(),
            ));
        }
        Ok(())
    }

    /// The sentinel endpoints, split on commas.
    pub fn sentinel_endpoints(&self) -> Vec<&str> {
        self.sentinel_endpoint
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
