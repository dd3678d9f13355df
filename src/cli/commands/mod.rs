//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration if it needs the repository root or the cache
//! 2. Calls the read client (or the diff parser)
//! 3. Prints the result as pretty JSON on stdout
//!
//! # Async Commands
//!
//! Repository commands are async because they go through the client. Each
//! handler builds a `tokio::runtime::Runtime` and blocks on its work.

mod completion;
mod config_cmd;
mod diff_headers;
mod last_commit;
mod read;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use config_cmd::check_config;
pub use diff_headers::diff_headers;
pub use last_commit::last_commit;
pub use read::{commit, divergence, log, merge_base, parse_pair, LogArgs};

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::Command;
use crate::client::{CallContext, Client};
use crate::core::config::Config;
use crate::server::LocalRepoService;

/// Settings shared by every command, taken from global flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file (`--config`).
    pub config_path: Option<PathBuf>,
    /// Deadline for repository reads (`--timeout`).
    pub timeout: Option<Duration>,
}

impl Context {
    /// Load and validate configuration.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config_path.as_deref()).context("Failed to load configuration")
    }

    /// Client over the repositories under the configured root.
    pub fn client(&self, config: &Config) -> Client {
        Client::new(Arc::new(LocalRepoService::new(
            config.server.git_root.clone(),
        )))
    }

    /// Cancellation context for one command.
    pub fn call_context(&self) -> CallContext {
        match self.timeout {
            Some(timeout) => CallContext::new().with_timeout(timeout),
            None => CallContext::new(),
        }
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::CheckConfig => config_cmd::check_config(ctx),
        Command::DiffHeaders { file } => diff_headers::diff_headers(file.as_deref()),
        Command::Commit { repo, rev } => read::commit(ctx, &repo, &rev),
        Command::Log {
            repo,
            git_ref,
            after,
            page,
            limit,
            path,
            since,
            until,
            committer,
        } => read::log(
            ctx,
            &LogArgs {
                repo,
                git_ref,
                after: after.unwrap_or_default(),
                page,
                limit,
                path: path.unwrap_or_default(),
                since,
                until,
                committer: committer.unwrap_or_default(),
            },
        ),
        Command::Divergence {
            repo,
            pairs,
            max_count,
        } => read::divergence(ctx, &repo, &pairs, max_count),
        Command::MergeBase { repo, ref1, ref2 } => read::merge_base(ctx, &repo, &ref1, &ref2),
        Command::LastCommit {
            repo,
            git_ref,
            path,
        } => last_commit::last_commit(ctx, &repo, &git_ref, &path),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
