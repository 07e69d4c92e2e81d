//! Test utilities for artifact-relay
//!
//! Builders for identities and uploads plus in-memory stand-ins for the CI
//! provider, the comment sink and storage backends.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::ci::{CiProvider, CommentSink, JobLogSource, PullRequestInfo, WorkflowJob};
use crate::cloud::ObjectStore;
use crate::models::{ArtifactBlob, RepoRef, ResolvedArtifact, SuiteId, UploadContext, UploadIdentity};
use crate::utils::hash::sha256_hex;

pub const TEST_COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

/// Identity of an upload to octo/widgets#42 at [`TEST_COMMIT`]
pub fn identity(job_name: &str) -> UploadIdentity {
    UploadIdentity {
        repository: RepoRef::new("octo", "widgets"),
        commit_hash: TEST_COMMIT.to_string(),
        pull_number: 42,
        job_name: job_name.to_string(),
        run_id: 1001,
    }
}

pub fn blob(data: &[u8]) -> ArtifactBlob {
    ArtifactBlob {
        data: Bytes::copy_from_slice(data),
        content_hash: sha256_hex(data),
    }
}

pub fn resolved(data: &[u8], file_name: &str) -> ResolvedArtifact {
    ResolvedArtifact::new(blob(data), file_name)
}

pub fn upload_context(job_name: &str, files: &[&[u8]]) -> UploadContext {
    UploadContext {
        upload_id: uuid::Uuid::new_v4().to_string(),
        identity: identity(job_name),
        declared_lengths: files.iter().map(|f| f.len() as u64).collect(),
        artifacts: files.iter().map(|f| blob(f)).collect(),
    }
}

/// Job log text embedding a manifest for the given files
pub fn manifest_log(files: &[(&str, &[u8])]) -> String {
    let entries: Vec<_> = files
        .iter()
        .map(|(name, data)| {
            serde_json::json!({ "filename": name, "sha256_checksum": sha256_hex(data) })
        })
        .collect();
    format!(
        "2024-05-01T10:00:00.000Z ##[group]Run ./build.sh\n\
         2024-05-01T10:00:41.000Z BuildFileHashes: {}\n\
         2024-05-01T10:00:42.000Z ##[endgroup]\n",
        serde_json::Value::Array(entries)
    )
}

#[derive(Default)]
struct CiState {
    pull_request: Option<PullRequestInfo>,
    commits: Vec<String>,
    suites: HashMap<String, SuiteId>,
    jobs: Vec<WorkflowJob>,
    logs: HashMap<u64, String>,
}

/// Scriptable CI provider and log source.
///
/// Unset state answers like an unreachable provider (pull request, logs)
/// or an empty listing (check runs, jobs).
#[derive(Default)]
pub struct FakeCi {
    state: Mutex<CiState>,
}

impl FakeCi {
    pub fn set_pull_request(&self, pull_request: PullRequestInfo) {
        self.state.lock().unwrap().pull_request = Some(pull_request);
    }

    pub fn set_commits(&self, commits: Vec<String>) {
        self.state.lock().unwrap().commits = commits;
    }

    pub fn set_suite(&self, job_name: &str, suite_id: SuiteId) {
        self.state.lock().unwrap().suites.insert(job_name.to_string(), suite_id);
    }

    pub fn set_jobs(&self, jobs: Vec<WorkflowJob>) {
        self.state.lock().unwrap().jobs = jobs;
    }

    pub fn set_log(&self, job_id: u64, log: String) {
        self.state.lock().unwrap().logs.insert(job_id, log);
    }
}

#[async_trait]
impl CiProvider for FakeCi {
    async fn pull_request(&self, _repo: &RepoRef, _number: u64) -> Result<PullRequestInfo> {
        self.state
            .lock()
            .unwrap()
            .pull_request
            .clone()
            .ok_or_else(|| anyhow!("502 Bad Gateway"))
    }

    async fn pull_request_commits(&self, _repo: &RepoRef, _number: u64) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().commits.clone())
    }

    async fn check_suite_id(&self, _repo: &RepoRef, _commit: &str, check_name: &str) -> Result<Option<SuiteId>> {
        Ok(self.state.lock().unwrap().suites.get(check_name).copied())
    }

    async fn workflow_jobs(&self, _repo: &RepoRef, _run_id: u64) -> Result<Vec<WorkflowJob>> {
        Ok(self.state.lock().unwrap().jobs.clone())
    }
}

#[async_trait]
impl JobLogSource for FakeCi {
    async fn job_log(&self, _repo: &RepoRef, job_id: u64) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .logs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| anyhow!("404 log of job {} not found", job_id))
    }
}

/// Records every posted comment as (repository, issue number, body).
#[derive(Default)]
pub struct RecordingComments {
    posted: Mutex<Vec<(String, u64, String)>>,
}

impl RecordingComments {
    pub fn posted(&self) -> Vec<(String, u64, String)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentSink for RecordingComments {
    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        self.posted
            .lock()
            .unwrap()
            .push((repo.full_name(), issue_number, body.to_string()));
        Ok(())
    }
}

/// In-memory object store; a hanging store never completes a write.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
    hang: bool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn get(&self, destination: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(destination).cloned()
    }

    pub fn put_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn describe(&self, destination: &str) -> String {
        format!("memory://{}", destination)
    }

    async fn put(&self, destination: &str, data: Bytes) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.objects.lock().unwrap().insert(destination.to_string(), data);
        Ok(())
    }
}
