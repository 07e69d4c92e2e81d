//! Utility functions shared by the pipeline stages.
//!
//! ## Components
//!
//! - **Hashing**: SHA-256 helpers used for artifact identity
//! - **Timeouts**: deadline-with-one-retry wrapper for network and storage calls
//!
//! ## Common Use Cases
//!
//! ### Hashing a Buffer
//!
//! ```
//! use artifact_relay::utils::hash::{sha256_hex, hashes_equal};
//!
//! let digest = sha256_hex(b"abc");
//! assert!(hashes_equal(&digest, &digest.to_uppercase()));
//! ```

/// Cryptographic hash calculation utilities
pub mod hash;

/// Timeout wrapper with a single retry
pub mod timeout;
