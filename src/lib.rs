//! # artifact-relay
//!
//! Relays build artifacts produced by CI jobs into long-lived storage and
//! republishes verified download links on the originating pull request.
//!
//! ## Overview
//!
//! A CI job streams its build outputs to the relay in one `PUT` body, with the
//! file sizes and the job's identity carried in headers. The relay splits the
//! body into files, hashing each one as it arrives, and parks the upload under
//! the job's check suite. When GitHub reports the suite as completed, every
//! parked upload is matched against the `BuildFileHashes` manifest printed in
//! its job log, written to the repository's storage targets and summarized in
//! a single pull request comment.
//!
//! ## Usage
//!
//! ```no_run
//! use artifact_relay::config::RelayConfig;
//! use artifact_relay::server::{self, AppState};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RelayConfig::load(Path::new("config.yml"))?;
//! let addr = ([0, 0, 0, 0], config.listening_port).into();
//! server::serve(AppState::from_config(config)?, addr).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: YAML configuration with environment variable expansion
//! - [`pipeline`]: Demultiplexing, aggregation, manifest resolution, publishing and reporting
//! - [`server`]: HTTP upload and webhook endpoints
//! - [`ci`]: GitHub REST client behind provider traits
//! - [`cloud`]: Storage backends (local filesystem, S3)
//! - [`security`]: Webhook signatures, path validation and credential scrubbing
//! - [`models`]: Core data models
//! - [`error`]: Typed pipeline errors
//! - [`utils`]: Hashing and timeout helpers
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Typed errors of the relay pipeline
pub mod error;

/// Utility functions for hashing and timeouts
pub mod utils;

/// CI provider integration (GitHub)
pub mod ci;

/// Storage backends (local filesystem, S3)
pub mod cloud;

/// Configuration management
pub mod config;

/// The relay pipeline stages
pub mod pipeline;

/// HTTP endpoints
pub mod server;

/// Application constants and configuration values
pub mod constants;

/// Security utilities for signatures, path validation and credential protection
pub mod security;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
