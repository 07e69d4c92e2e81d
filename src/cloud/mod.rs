//! Storage backends for published artifacts.
//!
//! Every backend implements [`ObjectStore`]: write a byte buffer to a rendered
//! destination (a filesystem path or an object key). Writes are idempotent by
//! destination; publishing the same artifact twice overwrites it.
//!
//! ## Supported Backends
//!
//! - **Local filesystem**: [`local::LocalFileStore`]
//! - **Amazon S3**: [`s3::S3Store`], including S3-compatible endpoints
//!
//! ## Usage Example
//!
//! ```no_run
//! use artifact_relay::cloud::{ObjectStore, local::LocalFileStore};
//! use bytes::Bytes;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = LocalFileStore::new();
//! store.put("/srv/builds/octo/widgets/42/game.zip", Bytes::from_static(b"...")).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

#[cfg(test)]
use mockall::automock;

/// S3 client construction
pub mod client;

/// Local filesystem backend
pub mod local;

/// Amazon S3 backend
pub mod s3;

/// A destination that can receive artifact bytes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location of `destination` (for logs/errors)
    fn describe(&self, destination: &str) -> String;

    /// Write `data` to `destination`, replacing whatever is there
    async fn put(&self, destination: &str, data: Bytes) -> Result<()>;
}
