//! Security helpers shared by the HTTP surface and the storage backends.
//!
//! - Webhook signature verification
//! - Storage destination validation
//! - Credential scrubbing before anything reaches the log

pub mod credential_scrubber;
pub mod path_validator;
pub mod signature;

pub use credential_scrubber::{safe_error_message, scrub_credentials};
pub use path_validator::{validate_destination, validate_object_key};
pub use signature::{sign, verify_signature};
