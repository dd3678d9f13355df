//! gitread - read path of a Git hosting backend
//!
//! gitread answers read-only questions about hosted repositories: single
//! commits, filtered and paged history, ahead/behind counts between refs,
//! and merge bases. It also parses hunk headers out of unified diffs and
//! keeps a last-commit-per-path cache in front of history lookups.
//!
//! # Architecture
//!
//! - [`client`] - Validating read client; maps wire messages to domain types
//! - [`rpc`] - Wire contract: messages, status codes, the `RepoService` trait
//! - [`server`] - In-process `RepoService` over repositories on disk (git2)
//! - [`core`] - Domain types and service configuration
//! - [`parser`] - Unified diff header parser
//! - [`cache`] - Last-commit cache backends (disabled, local, distributed)
//! - [`history`] - Last-commit lookup, optionally through the cache
//! - [`cli`] - Command-line front end
//!
//! # Correctness Invariants
//!
//! 1. Malformed requests are rejected before anything is sent
//! 2. A response that breaks the message contract is an error, never a
//!    partial result
//! 3. Divergence results have one entry per request pair, in request order
//! 4. Only a clean end of stream ends a commit listing without error

pub mod cache;
pub mod cli;
pub mod client;
pub mod core;
pub mod history;
pub mod parser;
pub mod rpc;
pub mod server;
