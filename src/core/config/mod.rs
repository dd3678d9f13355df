//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. `GITREAD_*` environment variables
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. The path passed explicitly (e.g. `--config`); it must exist
//! 2. `$GITREAD_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitread/config.toml` (or the platform config dir)
//! 4. `./gitread.toml`
//!
//! Missing files are not an error; defaults are used and validation decides
//! whether the result is usable.
//!
//! # Example
//!
//! ```no_run
//! use gitread::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("cache mode: {}", config.server.last_commit_cache.cache_mode().unwrap());
//! ```

pub mod schema;

pub use schema::{CacheMode, HttpConfig, LastCommitCacheConfig, RedisConfig, ServerConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITREAD_CONFIG";

/// Errors from configuration operations.
///
/// Every variant prevents startup; none are retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Path of the file the config was read from, if any.
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations and the process
    /// environment, then validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, an
    /// environment override is malformed, or validation fails.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        Self::load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with_env<F>(explicit: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = Self::locate(explicit, &lookup)?;
        let mut server = match &path {
            Some(p) => Self::read_config(p)?,
            None => ServerConfig::default(),
        };

        apply_env_overrides(&mut server, &lookup)?;
        server.validate()?;

        Ok(Config { server, path })
    }

    /// Find the config file to read.
    fn locate<F>(explicit: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Explicit path must exist
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            return Ok(Some(path.to_path_buf()));
        }

        // 2. Check $GITREAD_CONFIG
        if let Some(path) = lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        // 3. Check $XDG_CONFIG_HOME/gitread/config.toml
        let config_home = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir);
        if let Some(home) = config_home {
            let path = home.join("gitread/config.toml");
            if path.exists() {
                return Ok(Some(path));
            }
        }

        // 4. Check ./gitread.toml
        let local = PathBuf::from("gitread.toml");
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(None)
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Apply `GITREAD_*` overrides on top of `config`.
///
/// Empty values are ignored so an exported-but-blank variable does not clear
/// a setting from the file.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = get("GITREAD_PORT") {
        config.port = parse_env("GITREAD_PORT", &v)?;
    }
    if let Some(v) = get("GITREAD_GIT_ROOT") {
        config.git_root = PathBuf::from(v);
    }
    if let Some(v) = get("GITREAD_TMP_DIR") {
        config.tmp_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get("GITREAD_GIT_HOOK_PATH") {
        config.git_hook_path = PathBuf::from(v);
    }
    if let Some(v) = get("GITREAD_HTTP_PORT") {
        config.http.port = parse_env("GITREAD_HTTP_PORT", &v)?;
    }
    if let Some(v) = get("GITREAD_MAX_CONN_AGE_SECS") {
        config.max_conn_age_secs = parse_env("GITREAD_MAX_CONN_AGE_SECS", &v)?;
    }
    if let Some(v) = get("GITREAD_MAX_CONN_AGE_GRACE_SECS") {
        config.max_conn_age_grace_secs = parse_env("GITREAD_MAX_CONN_AGE_GRACE_SECS", &v)?;
    }
    if let Some(v) = get("GITREAD_LAST_COMMIT_CACHE_MODE") {
        config.last_commit_cache.mode = v;
    }
    if let Some(v) = get("GITREAD_LAST_COMMIT_CACHE_SECONDS") {
        config.last_commit_cache.duration_seconds =
            parse_env("GITREAD_LAST_COMMIT_CACHE_SECONDS", &v)?;
    }
    if let Some(v) = get("GITREAD_REDIS_ENDPOINT") {
        config.redis.endpoint = v;
    }
    if let Some(v) = get("GITREAD_REDIS_MAX_RETRIES") {
        config.redis.max_retries = parse_env("GITREAD_REDIS_MAX_RETRIES", &v)?;
    }
    if let Some(v) = get("GITREAD_REDIS_MIN_IDLE_CONNECTIONS") {
        config.redis.min_idle_connections = parse_env("GITREAD_REDIS_MIN_IDLE_CONNECTIONS", &v)?;
    }
    if let Some(v) = get("GITREAD_REDIS_PASSWORD") {
        config.redis.password = Some(v);
    }
    if let Some(v) = get("GITREAD_REDIS_USE_SENTINEL") {
        config.redis.sentinel_mode = parse_env("GITREAD_REDIS_USE_SENTINEL", &v)?;
    }
    if let Some(v) = get("GITREAD_REDIS_SENTINEL_MASTER") {
        config.redis.sentinel_master = v;
    }
    if let Some(v) = get("GITREAD_REDIS_SENTINEL_ENDPOINT") {
        config.redis.sentinel_endpoint = v;
    }

    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{}: cannot parse '{}'", key, value)))
}
