use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ci::{CiProvider, CommentSink, JobLogSource, PullRequestInfo, WorkflowJob};
use crate::constants::{DEFAULT_API_TIMEOUT_SECS, GITHUB_PAGE_SIZE, USER_AGENT};
use crate::models::{RepoRef, SuiteId};
use crate::security::credential_scrubber::scrub_credentials;

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
    #[serde(default)]
    author_association: String,
    #[serde(default)]
    labels: Vec<LabelPayload>,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CheckRunList {
    #[serde(default)]
    check_runs: Vec<CheckRunPayload>,
}

#[derive(Debug, Deserialize)]
struct CheckRunPayload {
    id: u64,
    #[serde(default)]
    check_suite: Option<CheckSuiteRef>,
}

#[derive(Debug, Deserialize)]
struct CheckSuiteRef {
    id: SuiteId,
}

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    jobs: Vec<WorkflowJob>,
}

/// GitHub REST API client.
///
/// Authenticates with a bearer token when one is configured. Job logs are
/// served through a redirect to blob storage which `reqwest` follows; the
/// authorization header is not forwarded across hosts.
///
/// Only the connection phase has a client-wide limit. JSON calls get a
/// per-request deadline; log downloads get none so the caller's
/// `log_timeout` governs them.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn api_timeout() -> Duration {
        Duration::from_secs(DEFAULT_API_TIMEOUT_SECS)
    }

    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, repo.owner, repo.repo, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| anyhow!("{} request failed: {}", what, scrub_credentials(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} failed ({}): {}",
                what,
                status,
                scrub_credentials(body.trim())
            ));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)], what: &str) -> Result<T> {
        let request = self.http.get(url).query(query).timeout(Self::api_timeout());
        let response = self.send(request, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("{}: unexpected response body", what))
    }
}

#[async_trait]
impl CiProvider for GitHubClient {
    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequestInfo> {
        let url = self.repo_url(repo, &format!("pulls/{}", number));
        let payload: PullRequestPayload = self.get_json(&url, &[], "Fetching pull request").await?;

        Ok(PullRequestInfo {
            number: payload.number,
            author_association: payload.author_association,
            labels: payload.labels.into_iter().map(|l| l.name).collect(),
        })
    }

    async fn pull_request_commits(&self, repo: &RepoRef, number: u64) -> Result<Vec<String>> {
        let url = self.repo_url(repo, &format!("pulls/{}/commits", number));
        let mut commits = Vec::new();

        for page in 1.. {
            let query = [("per_page", GITHUB_PAGE_SIZE.to_string()), ("page", page.to_string())];
            let batch: Vec<CommitPayload> =
                self.get_json(&url, &query, "Listing pull request commits").await?;
            let last_page = batch.len() < GITHUB_PAGE_SIZE;
            commits.extend(batch.into_iter().map(|c| c.sha));
            if last_page {
                break;
            }
        }

        debug!("Pull request {}#{} has {} commits", repo, number, commits.len());
        Ok(commits)
    }

    async fn check_suite_id(&self, repo: &RepoRef, commit: &str, check_name: &str) -> Result<Option<SuiteId>> {
        let url = self.repo_url(repo, &format!("commits/{}/check-runs", commit));
        let query = [("check_name", check_name.to_string())];
        let list: CheckRunList = self.get_json(&url, &query, "Listing check runs").await?;

        let Some(run) = list.check_runs.into_iter().next() else {
            return Ok(None);
        };
        let suite_id = run.check_suite.map(|s| s.id);
        debug!("Check run {} of {}@{} belongs to suite {:?}", run.id, repo, commit, suite_id);
        Ok(suite_id)
    }

    async fn workflow_jobs(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<WorkflowJob>> {
        let url = self.repo_url(repo, &format!("actions/runs/{}/jobs", run_id));
        let mut jobs = Vec::new();

        for page in 1.. {
            let query = [("per_page", GITHUB_PAGE_SIZE.to_string()), ("page", page.to_string())];
            let list: JobList = self.get_json(&url, &query, "Listing workflow jobs").await?;
            let fetched = list.jobs.len();
            jobs.extend(list.jobs);
            if fetched < GITHUB_PAGE_SIZE || jobs.len() >= list.total_count {
                break;
            }
        }

        Ok(jobs)
    }
}

#[async_trait]
impl JobLogSource for GitHubClient {
    async fn job_log(&self, repo: &RepoRef, job_id: u64) -> Result<String> {
        let url = self.repo_url(repo, &format!("actions/jobs/{}/logs", job_id));
        let response = self.send(self.http.get(&url), "Downloading job log").await?;
        let text = response.text().await.context("Failed to read job log body")?;
        debug!("Fetched {} bytes of log for job {}", text.len(), job_id);
        Ok(text)
    }
}

#[async_trait]
impl CommentSink for GitHubClient {
    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        let url = self.repo_url(repo, &format!("issues/{}/comments", issue_number));
        let request = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "body": body }))
            .timeout(Self::api_timeout());
        self.send(request, "Posting comment").await?;
        Ok(())
    }
}
