//! CI provider collaborators.
//!
//! The pipeline only talks to the CI system through the three traits below,
//! so the GitHub implementation can be swapped for fakes in tests or for a
//! different log acquisition strategy.
//!
//! - [`CiProvider`]: pull request metadata, commits, check runs and workflow jobs
//! - [`JobLogSource`]: raw text of one job's log
//! - [`CommentSink`]: posting the consolidated report

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{RepoRef, SuiteId};

/// GitHub REST implementation of every trait
pub mod github;

/// Process-wide serialization of log retrieval
pub mod gate;

/// Pull request fields used to admit uploads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullRequestInfo {
    pub number: u64,
    /// e.g. `OWNER`, `MEMBER`, `CONTRIBUTOR`
    pub author_association: String,
    pub labels: Vec<String>,
}

impl PullRequestInfo {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// One job of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait CiProvider: Send + Sync {
    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequestInfo>;

    /// SHAs of every commit in the pull request
    async fn pull_request_commits(&self, repo: &RepoRef, number: u64) -> Result<Vec<String>>;

    /// Suite of the first check run named `check_name` on `commit`
    async fn check_suite_id(
        &self,
        repo: &RepoRef,
        commit: &str,
        check_name: &str,
    ) -> Result<Option<SuiteId>>;

    async fn workflow_jobs(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<WorkflowJob>>;
}

#[async_trait]
pub trait JobLogSource: Send + Sync {
    async fn job_log(&self, repo: &RepoRef, job_id: u64) -> Result<String>;
}

#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()>;
}
