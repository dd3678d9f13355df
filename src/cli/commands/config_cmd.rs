//! check-config command - Validate configuration and show effective settings

use anyhow::Result;
use serde_json::json;

use super::{print_json, Context};

/// Load and validate configuration, then print a summary.
///
/// Secrets (the Redis password) are reported only as present or absent.
pub fn check_config(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let server = &config.server;
    let cache = &server.last_commit_cache;

    let summary = json!({
        "config_file": config.loaded_from().map(|p| p.display().to_string()),
        "port": server.port,
        "http_port": server.http.port,
        "git_root": server.git_root.display().to_string(),
        "git_hook_path": server.git_hook_path.display().to_string(),
        "tmp_dir": server.tmp_dir.as_ref().map(|p| p.display().to_string()),
        "max_conn_age_secs": server.max_conn_age_secs,
        "max_conn_age_grace_secs": server.max_conn_age_grace_secs,
        "last_commit_cache": {
            "mode": cache.cache_mode()?.to_string(),
            "duration_seconds": cache.duration_seconds,
            "max_entries": cache.max_entries,
        },
        "redis": {
            "endpoint": server.redis.endpoint,
            "max_retries": server.redis.max_retries,
            "min_idle_connections": server.redis.min_idle_connections,
            "password_set": server.redis.password.is_some(),
            "sentinel_mode": server.redis.sentinel_mode,
            "sentinel_master": server.redis.sentinel_master,
            "sentinel_endpoints": server.redis.sentinel_endpoints(),
        },
    });

    print_json(&summary)
}
