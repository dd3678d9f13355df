//! last-commit command - Last commit touching a path, through the cache

use anyhow::{Context as _, Result};

use super::{print_json, Context};
use crate::cache::create_cache;
use crate::core::types::ReadParams;
use crate::history::{CachedLastCommitFinder, LastCommitFinder};

/// Print the most recent commit reachable from `git_ref` that changed `path`.
pub fn last_commit(ctx: &Context, repo: &str, git_ref: &str, path: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let cache_config = &config.server.last_commit_cache;

    let rt = tokio::runtime::Runtime::new()?;
    let commit = rt.block_on(async {
        let cache = create_cache(cache_config, &config.server.redis)
            .context("Failed to set up last commit cache")?;
        let finder = CachedLastCommitFinder::new(ctx.client(&config), cache, cache_config.ttl());

        finder
            .find_last_commit(&ctx.call_context(), &ReadParams::new(repo), git_ref, path)
            .await
            .with_context(|| format!("Failed to find last commit for '{}'", path))
    })?;

    print_json(&commit)
}
