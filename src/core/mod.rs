//! core
//!
//! Core domain types and service configuration.
//!
//! # Modules
//!
//! - [`types`] - Commits, signatures, divergences and diff structure
//! - [`config`] - Service configuration schema, loading and validation
//!
//! # Design Principles
//!
//! - Domain types are plain values, immutable once mapped
//! - Configuration is validated once, before anything starts

pub mod config;
pub mod types;
