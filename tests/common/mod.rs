//! Shared fixtures for the integration tests.
//!
//! A scriptable GitHub stand-in plus a relay wired to a temporary directory,
//! so the full upload and webhook flow runs without network access.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use artifact_relay::ci::{CiProvider, CommentSink, JobLogSource, PullRequestInfo, WorkflowJob};
use artifact_relay::config::RelayConfig;
use artifact_relay::models::{RepoRef, SuiteId};
use artifact_relay::pipeline::{
    ManifestResolver, PublisherRegistry, ReportAggregator, SuiteAggregator, SuiteProcessor,
};
use artifact_relay::server::AppState;
use artifact_relay::utils::hash::sha256_hex;

pub const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";
pub const SECRET: &str = "It's a Secret to Everybody";
pub const SUITE_ID: SuiteId = 5150;
pub const RUN_ID: u64 = 1001;

#[derive(Default)]
struct GitHubState {
    pull_request: Option<PullRequestInfo>,
    commits: Vec<String>,
    suites: HashMap<String, SuiteId>,
    jobs: Vec<WorkflowJob>,
    logs: HashMap<u64, String>,
    comments: Vec<(String, u64, String)>,
}

/// In-memory GitHub: pull requests, check runs, job logs and comments.
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<GitHubState>,
}

impl FakeGitHub {
    /// A member's pull request #42 containing [`COMMIT`]
    pub fn member_pull_request() -> Self {
        let github = Self::default();
        {
            let mut state = github.state.lock().unwrap();
            state.pull_request = Some(PullRequestInfo {
                number: 42,
                author_association: "MEMBER".to_string(),
                labels: Vec::new(),
            });
            state.commits = vec![COMMIT.to_string()];
        }
        github
    }

    /// Register a job of run [`RUN_ID`] under [`SUITE_ID`] with its log.
    pub fn add_job(&self, job_id: u64, name: &str, log: String) {
        let mut state = self.state.lock().unwrap();
        state.suites.insert(name.to_string(), SUITE_ID);
        state.jobs.push(WorkflowJob {
            id: job_id,
            name: name.to_string(),
            status: Some("completed".to_string()),
        });
        state.logs.insert(job_id, log);
    }

    pub fn comments(&self) -> Vec<(String, u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }
}

#[async_trait]
impl CiProvider for FakeGitHub {
    async fn pull_request(&self, _repo: &RepoRef, _number: u64) -> Result<PullRequestInfo> {
        self.state
            .lock()
            .unwrap()
            .pull_request
            .clone()
            .ok_or_else(|| anyhow!("pull request not found"))
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
impl JobLogSource for FakeGitHub {
    async fn job_log(&self, _repo: &RepoRef, job_id: u64) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .logs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| anyhow!("log of job {} not found", job_id))
    }
}

#[async_trait]
impl CommentSink for FakeGitHub {
    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .comments
            .push((repo.full_name(), issue_number, body.to_string()));
        Ok(())
    }
}

/// Job log text carrying a manifest for the given files
pub fn manifest_log(files: &[(&str, &[u8])]) -> String {
    let entries: Vec<_> = files
        .iter()
        .map(|(name, data)| serde_json::json!({ "filename": name, "sha256_checksum": sha256_hex(data) }))
        .collect();
    format!(
        "2024-05-01T10:00:00.000Z ##[group]Run ./build.sh\n\
         2024-05-01T10:00:41.000Z BuildFileHashes: {}\n\
         2024-05-01T10:00:42.000Z ##[endgroup]\n",
        serde_json::Value::Array(entries)
    )
}

/// Configuration publishing octo/widgets into `root` with public links.
pub fn relay_config(root: &Path) -> RelayConfig {
    let yaml = format!(
        r#"
repositories:
  octo/widgets:
    gh_notify_secret: "{secret}"
    storages:
      - storage: local
        publish_url: true
storages:
  local:
    method: file
    path: "{root}/[:owner]/[:repo]/[:pull_number]/[:file_name]"
    public_url: "https://builds.example.com/[:pull_number]/[:file_name]"
"#,
        secret = SECRET,
        root = root.display()
    );
    let config = RelayConfig::from_yaml_str(&yaml).unwrap();
    config.validate().unwrap();
    config
}

/// Relay state with every GitHub seam pointed at `github`.
pub fn app_state(config: RelayConfig, github: Arc<FakeGitHub>) -> AppState {
    let processor = SuiteProcessor::new(
        github.clone(),
        github.clone(),
        ManifestResolver::new(&config.manifest_pattern).unwrap(),
        Arc::new(PublisherRegistry::from_config(&config).unwrap()),
        ReportAggregator::new(github.clone()),
        Duration::from_secs(5),
    );
    AppState::new(
        Arc::new(config),
        github,
        Arc::new(SuiteAggregator::new()),
        Arc::new(processor),
    )
}
