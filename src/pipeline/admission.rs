use std::collections::HashSet;

use log::{debug, info};

use crate::ci::CiProvider;
use crate::config::RelayConfig;
use crate::constants::TRUSTED_AUTHOR_ASSOCIATIONS;
use crate::error::AdmissionError;
use crate::models::{SuiteId, UploadIdentity};
use crate::security::credential_scrubber::safe_error_message;

/// Decides whether an upload may be read at all, before any body byte is consumed.
///
/// An upload is admitted when its repository is configured, its pull request
/// is trusted (author association or allow-upload label), and the declared
/// commit belongs to that pull request.
pub struct UploadGate {
    allowed: HashSet<String>,
    allow_label: String,
}

impl UploadGate {
    pub fn new(allowed: impl IntoIterator<Item = String>, allow_label: impl Into<String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            allow_label: allow_label.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.repositories.keys().cloned(),
            config.build_allowed_upload_label.clone(),
        )
    }

    pub async fn admit(&self, ci: &dyn CiProvider, identity: &UploadIdentity) -> Result<(), AdmissionError> {
        let repo = &identity.repository;
        if !self.allowed.contains(&repo.full_name()) {
            return Err(AdmissionError::RepositoryNotAllowed(repo.full_name()));
        }

        let pull_request = ci
            .pull_request(repo, identity.pull_number)
            .await
            .map_err(|e| AdmissionError::Provider(safe_error_message("Fetching pull request", &e)))?;

        let trusted_author = TRUSTED_AUTHOR_ASSOCIATIONS
            .iter()
            .any(|a| *a == pull_request.author_association);
        if !trusted_author && !pull_request.has_label(&self.allow_label) {
            info!(
                "Rejected upload for {}#{}: author is {} and label '{}' is missing",
                repo, identity.pull_number, pull_request.author_association, self.allow_label
            );
            return Err(AdmissionError::UploadNotPermitted(self.allow_label.clone()));
        }

        let commits = ci
            .pull_request_commits(repo, identity.pull_number)
            .await
            .map_err(|e| AdmissionError::Provider(safe_error_message("Listing pull request commits", &e)))?;
        if !commits.iter().any(|sha| sha.eq_ignore_ascii_case(&identity.commit_hash)) {
            return Err(AdmissionError::CommitNotInPullRequest(identity.commit_hash.clone()));
        }

        debug!("Admitted upload for {}#{} job '{}'", repo, identity.pull_number, identity.job_name);
        Ok(())
    }
}

/// Check suite an upload belongs to: the suite of the first check run named
/// after the job on the declared commit.
pub async fn resolve_suite(ci: &dyn CiProvider, identity: &UploadIdentity) -> Result<SuiteId, AdmissionError> {
    ci.check_suite_id(&identity.repository, &identity.commit_hash, &identity.job_name)
        .await
        .map_err(|e| AdmissionError::Provider(safe_error_message("Listing check runs", &e)))?
        .ok_or_else(|| AdmissionError::CheckRunNotFound {
            commit: identity.commit_hash.clone(),
            job_name: identity.job_name.clone(),
        })
}
