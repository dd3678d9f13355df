//! cli
//!
//! Command-line interface for gitread.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Delegate to command handlers, which print JSON on stdout
//!
//! # Architecture
//!
//! The CLI is a thin front end. Repository commands build a [`Client`]
//! over the in-process [`LocalRepoService`] and go through exactly the
//! same validation and mapping as any other caller.
//!
//! [`Client`]: crate::client::Client
//! [`LocalRepoService`]: crate::server::LocalRepoService

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.debug);

    let ctx = commands::Context {
        config_path: cli.config.clone(),
        timeout: cli.timeout.map(Duration::from_secs),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `--debug` forces debug level; otherwise `RUST_LOG`
/// applies, defaulting to info.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
