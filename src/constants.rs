//! Global constants for the artifact-relay service.
//!
//! This module centralizes hardcoded values so the pipeline, the HTTP surface
//! and the configuration defaults agree on them.

// HTTP surface
/// Default listening port when the configuration does not set one
pub const DEFAULT_LISTENING_PORT: u16 = 3000;

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Header carrying the repository owner on uploads
pub const HEADER_OWNER: &str = "owner";

/// Header carrying the repository name on uploads
pub const HEADER_REPO: &str = "repo";

/// Header carrying the full commit hash the artifacts were built from
pub const HEADER_COMMIT_HASH: &str = "commit_hash";

/// Header carrying the pull request number
pub const HEADER_PULL_NUMBER: &str = "pull_number";

/// Header carrying the CI job name
pub const HEADER_JOB_NAME: &str = "job_name";

/// Header carrying the workflow run id
pub const HEADER_RUN_ID: &str = "run_id";

/// Header carrying the comma-separated byte lengths of the concatenated files
pub const HEADER_FILE_SIZES: &str = "file_sizes";

/// Webhook signature header (HMAC-SHA256 over the raw body)
pub const HEADER_HUB_SIGNATURE_256: &str = "x-hub-signature-256";

/// Webhook event name header
pub const HEADER_GITHUB_EVENT: &str = "x-github-event";

/// Prefix of the signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

// CI provider
/// Default GitHub REST endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Label that allows uploads from pull requests by non-members
pub const DEFAULT_ALLOW_UPLOAD_LABEL: &str = "allow-build-upload";

/// Author associations that may always upload
pub const TRUSTED_AUTHOR_ASSOCIATIONS: [&str; 3] = ["OWNER", "MEMBER", "COLLABORATOR"];

/// Page size used when listing pull request commits and run jobs
pub const GITHUB_PAGE_SIZE: usize = 100;

/// User agent sent to the GitHub API
pub const USER_AGENT: &str = concat!("artifact-relay/", env!("CARGO_PKG_VERSION"));

// Manifest
/// Default manifest marker; capture group 1 is the JSON array
pub const DEFAULT_MANIFEST_PATTERN: &str = r"BuildFileHashes: (\[.+\])";

// Uploads
/// Default cap on the declared total of one upload (2GB)
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 2048;

/// Number of commit hash characters used for the short hash placeholder
pub const SHORT_COMMIT_HASH_LEN: usize = 8;

// Timeouts
/// Default timeout for retrieving one job log
pub const DEFAULT_LOG_TIMEOUT_SECS: u64 = 60;

/// Default timeout for one storage write
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 300;

/// Timeout for ordinary GitHub API calls
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

// Cloud storage constants
/// S3 upload chunk size (8MB, S3 minimum is 5MB)
pub const S3_UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Large artifact threshold for multipart uploads (50MB)
pub const LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Upper bound on concurrently uploaded multipart parts
pub const MAX_CONCURRENT_PARTS: usize = 4;

/// Largest accepted webhook payload (GitHub caps deliveries at 25MB)
pub const MAX_WEBHOOK_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Webhook event that triggers publishing
pub const CHECK_SUITE_EVENT: &str = "check_suite";

/// Action of [`CHECK_SUITE_EVENT`] that triggers publishing
pub const CHECK_SUITE_COMPLETED: &str = "completed";
