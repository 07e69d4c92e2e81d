use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::cloud::local::LocalFileStore;
use crate::cloud::s3::S3Store;
use crate::cloud::ObjectStore;
use crate::config::{RelayConfig, StorageDefinition, StorageMethod};
use crate::error::StorageWriteError;
use crate::models::{RepoRef, ResolvedArtifact, UploadIdentity};
use crate::pipeline::template::{PathTemplate, TemplateVars};
use crate::security::credential_scrubber::scrub_credentials;
use crate::utils::timeout::{retry_once_on_timeout, TimeoutError};

/// A configured storage: where bytes go and how their public URL reads.
pub struct StorageBackend {
    pub name: String,
    pub path: PathTemplate,
    /// Without a template the rendered destination itself is reported
    pub public_url: Option<PathTemplate>,
    pub store: Arc<dyn ObjectStore>,
}

impl StorageBackend {
    pub fn new(
        name: impl Into<String>,
        path: PathTemplate,
        public_url: Option<PathTemplate>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            public_url,
            store,
        }
    }

    pub fn from_definition(name: &str, definition: &StorageDefinition) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match definition.method {
            StorageMethod::File => Arc::new(LocalFileStore::new()),
            StorageMethod::S3 => {
                let settings = definition
                    .s3_settings()
                    .ok_or_else(|| anyhow!("S3 storage '{}' has no bucket", name))?;
                Arc::new(S3Store::new(&settings).with_context(|| format!("Storage '{}'", name))?)
            }
        };

        Ok(Self::new(
            name,
            definition.path_template()?,
            definition.public_url_template()?,
            store,
        ))
    }

    fn public_url_for(&self, vars: &TemplateVars<'_>, destination: &str) -> String {
        match &self.public_url {
            Some(template) => template.render(vars),
            None => destination.to_string(),
        }
    }
}

/// One storage selected by a repository.
#[derive(Clone)]
pub struct PublishTarget {
    pub backend: Arc<StorageBackend>,
    pub publish_url: bool,
}

/// Result of writing one artifact to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWrite {
    pub target: String,
    pub file_name: String,
    pub destination: String,
    /// Reported URL on success, when the target publishes URLs
    pub result: Result<Option<String>, StorageWriteError>,
}

/// Everything one job's artifacts produced across all targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPublishResult {
    pub urls: Vec<String>,
    pub writes: Vec<TargetWrite>,
}

impl JobPublishResult {
    pub fn succeeded(&self) -> usize {
        self.writes.iter().filter(|w| w.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StorageWriteError> {
        self.writes.iter().filter_map(|w| w.result.as_ref().err())
    }
}

/// Fans resolved artifacts out to a repository's storage targets.
///
/// Each (artifact, target) write is isolated: a failure or timeout is
/// recorded for that pair only and publishing continues with the rest.
/// Targets are visited in configuration order and, within a target,
/// artifacts in upload order; reported URLs keep that order.
pub struct StoragePublisher {
    targets: Vec<PublishTarget>,
    write_timeout: Duration,
}

impl StoragePublisher {
    pub fn new(targets: Vec<PublishTarget>, write_timeout: Duration) -> Self {
        Self {
            targets,
            write_timeout,
        }
    }

    pub fn targets(&self) -> &[PublishTarget] {
        &self.targets
    }

    pub async fn publish_job(&self, identity: &UploadIdentity, artifacts: &[ResolvedArtifact]) -> JobPublishResult {
        let mut result = JobPublishResult::default();

        for target in &self.targets {
            for artifact in artifacts {
                let write = self.publish_one(target, identity, artifact).await;
                if let Ok(Some(url)) = &write.result {
                    result.urls.push(url.clone());
                }
                result.writes.push(write);
            }
        }

        info!(
            "Published job '{}' of {}: {} writes succeeded, {} failed, {} URLs",
            identity.job_name,
            identity.repository,
            result.succeeded(),
            result.failures().count(),
            result.urls.len()
        );
        result
    }

    async fn publish_one(
        &self,
        target: &PublishTarget,
        identity: &UploadIdentity,
        artifact: &ResolvedArtifact,
    ) -> TargetWrite {
        let backend = target.backend.as_ref();
        let vars = TemplateVars::new(identity, artifact);
        let destination = backend.path.render(&vars);

        let store = backend.store.as_ref();
        let dest = destination.as_str();
        let data = artifact.blob.data.clone();
        let operation = format!("Writing {}", store.describe(dest));

        let outcome = retry_once_on_timeout(&operation, self.write_timeout, move || {
            store.put(dest, data.clone())
        })
        .await;

        let result = match outcome {
            Ok(()) => {
                debug!("Saved {} ({}) to {}", artifact.file_name, artifact.blob.content_hash, store.describe(dest));
                Ok(target
                    .publish_url
                    .then(|| backend.public_url_for(&vars, &destination)))
            }
            Err(e) => {
                let reason = match &e {
                    TimeoutError::Elapsed { .. } => e.to_string(),
                    TimeoutError::Inner(inner) => format!("{:#}", inner),
                };
                let error = StorageWriteError {
                    target: backend.name.clone(),
                    destination: destination.clone(),
                    reason: scrub_credentials(&reason),
                };
                warn!("Skipping target: {}", error);
                Err(error)
            }
        };

        TargetWrite {
            target: backend.name.clone(),
            file_name: artifact.file_name.clone(),
            destination,
            result,
        }
    }
}

/// Publishers for every configured repository.
#[derive(Default)]
pub struct PublisherRegistry {
    publishers: HashMap<String, StoragePublisher>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, repo: &RepoRef, publisher: StoragePublisher) {
        self.publishers.insert(repo.full_name(), publisher);
    }

    pub fn for_repository(&self, repo: &RepoRef) -> Option<&StoragePublisher> {
        self.publishers.get(&repo.full_name())
    }

    /// Build one backend per storage definition and wire repositories to them.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let mut backends = HashMap::new();
        for (name, definition) in &config.storages {
            let backend = StorageBackend::from_definition(name, definition)?;
            backends.insert(name.clone(), Arc::new(backend));
        }

        let mut registry = Self::new();
        for (full_name, repository) in &config.repositories {
            let repo = RepoRef::from_full_name(full_name)
                .ok_or_else(|| anyhow!("Repository key '{}' is not in owner/repo form", full_name))?;

            let mut targets = Vec::with_capacity(repository.storages.len());
            for selected in &repository.storages {
                let backend = backends
                    .get(&selected.storage)
                    .ok_or_else(|| anyhow!("Undefined storage '{}'", selected.storage))?;
                targets.push(PublishTarget {
                    backend: Arc::clone(backend),
                    publish_url: selected.publish_url,
                });
            }

            debug!("Repository {} publishes to {} targets", repo, targets.len());
            registry.insert(&repo, StoragePublisher::new(targets, config.storage_timeout()));
        }

        Ok(registry)
    }
}
