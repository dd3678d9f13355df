//! Repository read commands - commit, log, divergence, merge-base

use anyhow::{bail, Context as _, Result};

use super::{print_json, Context};
use crate::client::{
    GetCommitDivergencesParams, GetCommitParams, ListCommitsParams, MergeBaseParams,
};
use crate::core::types::{CommitDivergenceRequest, ReadParams};

/// Arguments of the `log` command.
#[derive(Debug, Clone, Default)]
pub struct LogArgs {
    pub repo: String,
    pub git_ref: String,
    pub after: String,
    pub page: i32,
    pub limit: i32,
    pub path: String,
    pub since: i64,
    pub until: i64,
    pub committer: String,
}

/// Show a single commit.
pub fn commit(ctx: &Context, repo: &str, rev: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let client = ctx.client(&config);
    let params = GetCommitParams {
        read: ReadParams::new(repo),
        sha: rev.to_string(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let commit = rt
        .block_on(client.get_commit(&ctx.call_context(), &params))
        .with_context(|| format!("Failed to get commit '{}'", rev))?;

    print_json(&commit)
}

/// List commits.
pub fn log(ctx: &Context, args: &LogArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let client = ctx.client(&config);
    let params = ListCommitsParams {
        read: ReadParams::new(args.repo.as_str()),
        git_ref: args.git_ref.clone(),
        after: args.after.clone(),
        page: args.page,
        limit: args.limit,
        path: args.path.clone(),
        since: args.since,
        until: args.until,
        committer: args.committer.clone(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let output = rt
        .block_on(client.list_commits(&ctx.call_context(), &params))
        .with_context(|| format!("Failed to list commits of '{}'", args.git_ref))?;

    print_json(&output)
}

/// Count ahead/behind commits for each `FROM...TO` pair.
pub fn divergence(ctx: &Context, repo: &str, pairs: &[String], max_count: i32) -> Result<()> {
    let requests = pairs
        .iter()
        .map(|p| parse_pair(p))
        .collect::<Result<Vec<_>>>()?;

    let config = ctx.load_config()?;
    let client = ctx.client(&config);
    let params = GetCommitDivergencesParams {
        read: ReadParams::new(repo),
        max_count,
        requests,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let divergences = rt
        .block_on(client.get_commit_divergences(&ctx.call_context(), &params))
        .context("Failed to count diverging commits")?;

    print_json(&divergences)
}

/// Find the merge base of two refs.
pub fn merge_base(ctx: &Context, repo: &str, ref1: &str, ref2: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let client = ctx.client(&config);
    let params = MergeBaseParams {
        read: ReadParams::new(repo),
        ref1: ref1.to_string(),
        ref2: ref2.to_string(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let sha = rt
        .block_on(client.merge_base(&ctx.call_context(), &params))
        .with_context(|| format!("Failed to find merge base of '{}' and '{}'", ref1, ref2))?;

    print_json(&serde_json::json!({ "merge_base_sha": sha }))
}

/// Parse `FROM...TO` into a divergence request.
pub fn parse_pair(pair: &str) -> Result<CommitDivergenceRequest> {
    match pair.split_once("...") {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok(CommitDivergenceRequest::new(from, to))
        }
        _ => bail!("Invalid pair '{}': expected FROM...TO", pair),
    }
}
