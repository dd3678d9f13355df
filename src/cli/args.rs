//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read this config file instead of searching
//! - `--debug`: Enable debug logging
//! - `--timeout <secs>`: Cancel repository reads after this long

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitread - query commit history, divergence and merge bases of hosted repositories
#[derive(Parser, Debug)]
#[command(name = "gitread")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use (default: $GITREAD_CONFIG, then the user config dir, then ./gitread.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Cancel repository reads after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate the configuration
    #[command(
        name = "check-config",
        long_about = "Load the configuration from the usual locations, apply GITREAD_* \
            environment overrides and validate it.\n\n\
            Prints a summary of the effective settings as JSON. Exits non-zero \
            if the configuration would prevent startup."
    )]
    CheckConfig,

    /// Print the per-file hunk headers of a unified diff
    #[command(
        name = "diff-headers",
        after_help = "\
EXAMPLES:
    git diff HEAD~1 | gitread diff-headers
    gitread diff-headers change.patch"
    )]
    DiffHeaders {
        /// Diff file to read (default: stdin)
        file: Option<PathBuf>,
    },

    /// Show a single commit
    Commit {
        /// Repository uid under the storage root
        repo: String,

        /// Commit sha or any revision
        rev: String,
    },

    /// List commits reachable from a ref
    #[command(
        after_help = "\
EXAMPLES:
    # Second page of 20 commits on main
    gitread log team/app main --page 2 --limit 20

    # History of one file, following renames
    gitread log team/app main --path src/lib.rs"
    )]
    Log {
        /// Repository uid under the storage root
        repo: String,

        /// Branch, tag or commit to start from
        git_ref: String,

        /// Stop at this ref (exclusive)
        #[arg(long)]
        after: Option<String>,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: i32,

        /// Commits per page (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: i32,

        /// Only commits that change this path
        #[arg(long)]
        path: Option<String>,

        /// Only commits committed at or after this Unix time
        #[arg(long, default_value_t = 0)]
        since: i64,

        /// Only commits committed at or before this Unix time
        #[arg(long, default_value_t = 0)]
        until: i64,

        /// Only commits whose committer name or email contains this text
        #[arg(long)]
        committer: Option<String>,
    },

    /// Count commits ahead and behind for pairs of refs
    Divergence {
        /// Repository uid under the storage root
        repo: String,

        /// Pairs written as FROM...TO
        #[arg(required = true, value_name = "FROM...TO")]
        pairs: Vec<String>,

        /// Stop counting each side after this many commits (0 = no limit)
        #[arg(long, default_value_t = 0)]
        max_count: i32,
    },

    /// Find the best common ancestor of two refs
    #[command(name = "merge-base")]
    MergeBase {
        /// Repository uid under the storage root
        repo: String,

        ref1: String,

        ref2: String,
    },

    /// Show the last commit that changed a path, through the configured cache
    #[command(name = "last-commit")]
    LastCommit {
        /// Repository uid under the storage root
        repo: String,

        /// Branch, tag or commit to look from
        git_ref: String,

        /// Path within the repository
        path: String,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    gitread completion bash > ~/.local/share/bash-completion/completions/gitread
    gitread completion zsh > ~/.zfunc/_gitread"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
