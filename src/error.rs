//! Error taxonomy of the relay pipeline.
//!
//! Each error type belongs to one unit of isolation: demultiplexing and
//! signature errors abort a single HTTP request, resolution errors abort a
//! single job of a suite, storage errors abort a single (artifact, target)
//! write. Nothing here is retried automatically.

use thiserror::Error;

/// Failure while splitting an upload body into artifacts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DemuxError {
    #[error("upload truncated: file {file_index} incomplete after {received} of {expected} declared bytes")]
    TruncatedUpload {
        file_index: usize,
        received: u64,
        expected: u64,
    },

    #[error("upload overflow: received more than the {expected} declared bytes")]
    Overflow { expected: u64 },

    #[error("upload stream failed: {0}")]
    Stream(String),
}

/// Failure while resolving one job's artifacts to manifest filenames.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("job log does not contain a build file manifest")]
    ManifestMissing,

    #[error("build file manifest is malformed: {0}")]
    ManifestMalformed(String),

    #[error("artifact hash {0} is not listed in the manifest")]
    HashNotFound(String),

    #[error("job '{0}' not found in workflow run")]
    JobNotFound(String),

    #[error("failed to retrieve job log: {0}")]
    LogRetrieval(String),
}

/// Failure writing one artifact to one storage target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage '{target}' failed to write {destination}: {reason}")]
pub struct StorageWriteError {
    pub target: String,
    pub destination: String,
    pub reason: String,
}

/// Rejection of an inbound webhook notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing or malformed")]
    MissingHeader,

    #[error("signature does not match payload")]
    Mismatch,

    #[error("repository '{0}' has no notification secret")]
    UnknownRepository(String),

    #[error("payload is not a repository event: {0}")]
    MalformedPayload(String),
}

/// Invalid storage path template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '[:{name}]' in template '{template}'")]
    UnknownPlaceholder { name: String, template: String },

    #[error("malformed or unterminated placeholder in template '{0}'")]
    Unterminated(String),
}

/// Rejection of an upload before its body is read.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("repository {0} is not permitted to use this service")]
    RepositoryNotAllowed(String),

    #[error("pull request is not allowed to upload builds, label it with '{0}'")]
    UploadNotPermitted(String),

    #[error("pull request does not contain commit {0}")]
    CommitNotInPullRequest(String),

    #[error("no check run named '{job_name}' found for commit {commit}")]
    CheckRunNotFound { commit: String, job_name: String },

    #[error("CI provider request failed: {0}")]
    Provider(String),
}
