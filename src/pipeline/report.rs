use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use crate::ci::CommentSink;
use crate::models::UploadIdentity;
use crate::security::credential_scrubber::safe_error_message;

const REPORT_HEADER: &str = "The following links are available: \n";

/// Public URLs of a suite grouped by job name, in job insertion order.
///
/// A job name seen twice keeps its first position and accumulates URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    jobs: Vec<(String, Vec<String>)>,
}

impl PublishReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job_name: &str, urls: impl IntoIterator<Item = String>) {
        match self.jobs.iter_mut().find(|(name, _)| name == job_name) {
            Some((_, existing)) => existing.extend(urls),
            None => self.jobs.push((job_name.to_string(), urls.into_iter().collect())),
        }
    }

    pub fn jobs(&self) -> &[(String, Vec<String>)] {
        &self.jobs
    }

    pub fn url_count(&self) -> usize {
        self.jobs.iter().map(|(_, urls)| urls.len()).sum()
    }

    /// Markdown body of the comment, `None` when there is nothing to report.
    pub fn render(&self) -> Option<String> {
        if self.url_count() == 0 {
            return None;
        }

        let mut message = String::from(REPORT_HEADER);
        for (job_name, urls) in self.jobs.iter().filter(|(_, urls)| !urls.is_empty()) {
            message.push_str(&format!("**{}**\n - {}\n\n", job_name, urls.join("\n - ")));
        }
        Some(message)
    }
}

/// Delivers one consolidated report per suite.
pub struct ReportAggregator {
    comments: Arc<dyn CommentSink>,
}

impl ReportAggregator {
    pub fn new(comments: Arc<dyn CommentSink>) -> Self {
        Self { comments }
    }

    /// Post `report` to the pull request of `target`.
    ///
    /// Returns whether a comment was posted; an empty report posts nothing.
    pub async fn deliver(&self, target: &UploadIdentity, report: &PublishReport) -> Result<bool> {
        let Some(body) = report.render() else {
            info!(
                "No public URLs for {}#{}, skipping report",
                target.repository, target.pull_number
            );
            return Ok(false);
        };

        if let Err(e) = self
            .comments
            .post_comment(&target.repository, target.pull_number, &body)
            .await
        {
            warn!("{}", safe_error_message("Failed to post build links", &e));
            return Err(e);
        }

        info!(
            "Posted {} build links to {}#{}",
            report.url_count(),
            target.repository,
            target.pull_number
        );
        Ok(true)
    }
}
