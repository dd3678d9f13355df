//! rpc
//!
//! Wire contract of the repository read service.
//!
//! # Modules
//!
//! - `messages`: Request and response messages as they travel on the wire
//! - `status`: Wire-level error status and codes
//! - `service`: The [`RepoService`] trait the client is written against
//! - [`mock`]: Scriptable implementation for deterministic testing
//!
//! The in-process implementation backed by a real repository lives in
//! [`crate::server`].

pub mod messages;
pub mod mock;
mod service;
mod status;

pub use service::{CommitStream, RepoService};
pub use status::{Code, Status};
