use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};

use crate::ci::{CiProvider, JobLogSource};
use crate::error::ResolveError;
use crate::models::{SuiteId, UploadContext};
use crate::pipeline::manifest::ManifestResolver;
use crate::pipeline::publisher::{JobPublishResult, PublisherRegistry};
use crate::pipeline::report::{PublishReport, ReportAggregator};
use crate::security::credential_scrubber::safe_error_message;
use crate::utils::timeout::retry_once_on_timeout;

/// What happened to one job of a drained suite.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_name: String,
    pub upload_id: String,
    pub result: Result<JobPublishResult, ResolveError>,
}

impl JobOutcome {
    pub fn urls(&self) -> &[String] {
        match &self.result {
            Ok(published) => &published.urls,
            Err(_) => &[],
        }
    }
}

/// Result of processing one drained suite batch.
#[derive(Debug)]
pub struct SuiteSummary {
    pub suite_id: SuiteId,
    pub outcomes: Vec<JobOutcome>,
    pub report: PublishReport,
    /// Whether a report comment was posted
    pub reported: bool,
}

/// Resolves, publishes and reports a drained suite batch.
///
/// Jobs run concurrently and each produces its own [`JobOutcome`]; a failing
/// job never affects its siblings. The report goes to the pull request of
/// the first upload in the batch.
pub struct SuiteProcessor {
    ci: Arc<dyn CiProvider>,
    logs: Arc<dyn JobLogSource>,
    resolver: ManifestResolver,
    publishers: Arc<PublisherRegistry>,
    reporter: ReportAggregator,
    log_timeout: Duration,
}

impl SuiteProcessor {
    pub fn new(
        ci: Arc<dyn CiProvider>,
        logs: Arc<dyn JobLogSource>,
        resolver: ManifestResolver,
        publishers: Arc<PublisherRegistry>,
        reporter: ReportAggregator,
        log_timeout: Duration,
    ) -> Self {
        Self {
            ci,
            logs,
            resolver,
            publishers,
            reporter,
            log_timeout,
        }
    }

    pub async fn process(&self, suite_id: SuiteId, batch: Vec<UploadContext>) -> SuiteSummary {
        let mut report = PublishReport::new();
        let Some(first) = batch.first() else {
            info!("Check suite {} completed with no queued uploads", suite_id);
            return SuiteSummary {
                suite_id,
                outcomes: Vec::new(),
                report,
                reported: false,
            };
        };
        let target = first.identity.clone();

        for context in &batch[1..] {
            let other = &context.identity;
            if other.repository != target.repository || other.pull_number != target.pull_number {
                warn!(
                    "Upload {} of suite {} targets {}#{}, reporting to {}#{} instead",
                    context.upload_id, suite_id, other.repository, other.pull_number,
                    target.repository, target.pull_number
                );
            }
        }

        info!("Processing {} uploads of check suite {}", batch.len(), suite_id);
        let outcomes = join_all(batch.iter().map(|context| self.process_job(context))).await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(published) => report.add(&outcome.job_name, published.urls.iter().cloned()),
                Err(e) => warn!(
                    "Publishing for job '{}' (upload {}) terminated: {}",
                    outcome.job_name, outcome.upload_id, e
                ),
            }
        }

        let reported = self.reporter.deliver(&target, &report).await.unwrap_or(false);

        SuiteSummary {
            suite_id,
            outcomes,
            report,
            reported,
        }
    }

    async fn process_job(&self, context: &UploadContext) -> JobOutcome {
        JobOutcome {
            job_name: context.identity.job_name.clone(),
            upload_id: context.upload_id.clone(),
            result: self.resolve_and_publish(context).await,
        }
    }

    async fn resolve_and_publish(&self, context: &UploadContext) -> Result<JobPublishResult, ResolveError> {
        let identity = &context.identity;
        let repo = &identity.repository;
        let ci = self.ci.as_ref();
        let logs = self.logs.as_ref();

        let jobs = retry_once_on_timeout("Listing workflow jobs", self.log_timeout, move || {
            ci.workflow_jobs(repo, identity.run_id)
        })
        .await
        .map_err(|e| ResolveError::LogRetrieval(safe_error_message("Listing workflow jobs", &e)))?;

        let job = jobs
            .iter()
            .find(|job| job.name == identity.job_name)
            .ok_or_else(|| ResolveError::JobNotFound(identity.job_name.clone()))?;
        let job_id = job.id;

        let log_text = retry_once_on_timeout("Fetching job log", self.log_timeout, move || {
            logs.job_log(repo, job_id)
        })
        .await
        .map_err(|e| ResolveError::LogRetrieval(safe_error_message("Fetching job log", &e)))?;

        let resolved = self.resolver.resolve_all(&log_text, &context.artifacts)?;

        match self.publishers.for_repository(repo) {
            Some(publisher) => Ok(publisher.publish_job(identity, &resolved).await),
            None => {
                warn!("Repository {} has no storage targets, nothing published", repo);
                Ok(JobPublishResult::default())
            }
        }
    }
}
