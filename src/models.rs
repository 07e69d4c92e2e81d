use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::SHORT_COMMIT_HASH_LEN;

/// Identifier of a CI check suite.
pub type SuiteId = u64;

/// A repository addressed as owner/name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse from "owner/repo" format
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Identifying metadata of one upload, carried in request headers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadIdentity {
    pub repository: RepoRef,
    pub commit_hash: String,
    pub pull_number: u64,
    pub job_name: String,
    pub run_id: u64,
}

impl UploadIdentity {
    pub fn short_commit_hash(&self) -> &str {
        let end = self
            .commit_hash
            .char_indices()
            .nth(SHORT_COMMIT_HASH_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.commit_hash.len());
        &self.commit_hash[..end]
    }
}

/// One demultiplexed file: raw bytes plus the SHA-256 computed while reading them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBlob {
    pub data: Bytes,
    /// Lowercase hex SHA-256 of `data`
    pub content_hash: String,
}

impl ArtifactBlob {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An artifact whose name has been taken from a trusted manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub blob: ArtifactBlob,
    pub file_name: String,
    /// Last path component of `file_name` without its extension
    pub file_base_name: String,
    /// Extension including the leading dot, empty when there is none
    pub file_extension: String,
}

impl ResolvedArtifact {
    pub fn new(blob: ArtifactBlob, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let path = Path::new(&file_name);
        let file_extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let file_base_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            blob,
            file_name,
            file_base_name,
            file_extension,
        }
    }
}

/// State of one accepted upload request, owned by the suite batch it is queued in.
#[derive(Debug, Clone)]
pub struct UploadContext {
    /// Correlates log lines of one request across the pipeline
    pub upload_id: String,
    pub identity: UploadIdentity,
    pub declared_lengths: Vec<u64>,
    pub artifacts: Vec<ArtifactBlob>,
}

impl UploadContext {
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(ArtifactBlob::len).sum()
    }
}
