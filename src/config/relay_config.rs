use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::{expand_in_place, expand_option};
use crate::config::storage_config::{RepositoryStorage, StorageDefinition, StorageMethod};
use crate::constants::{
    DEFAULT_ALLOW_UPLOAD_LABEL, DEFAULT_BIND_ADDRESS, DEFAULT_GITHUB_API_URL,
    DEFAULT_LISTENING_PORT, DEFAULT_LOG_TIMEOUT_SECS, DEFAULT_MANIFEST_PATTERN,
    DEFAULT_MAX_UPLOAD_MB, DEFAULT_STORAGE_TIMEOUT_SECS,
};
use crate::models::RepoRef;
use crate::pipeline::manifest::ManifestResolver;

/// Per-repository settings. Presence in the map is the allow-list.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepositoryConfig {
    /// Shared secret used to sign webhook notifications
    #[serde(default)]
    pub gh_notify_secret: Option<String>,
    #[serde(default)]
    pub storages: Vec<RepositoryStorage>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_listening_port")]
    pub listening_port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub github_auth_token: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    #[serde(default = "default_allow_upload_label")]
    pub build_allowed_upload_label: String,
    #[serde(default = "default_manifest_pattern")]
    pub manifest_pattern: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    #[serde(default = "default_log_timeout_secs")]
    pub log_timeout_secs: u64,
    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,
    /// Fetch at most one job log at a time
    #[serde(default)]
    pub serialize_log_retrieval: bool,
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
    #[serde(default)]
    pub storages: BTreeMap<String, StorageDefinition>,
}

fn default_listening_port() -> u16 {
    DEFAULT_LISTENING_PORT
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_allow_upload_label() -> String {
    DEFAULT_ALLOW_UPLOAD_LABEL.to_string()
}

fn default_manifest_pattern() -> String {
    DEFAULT_MANIFEST_PATTERN.to_string()
}

fn default_max_upload_mb() -> u64 {
    DEFAULT_MAX_UPLOAD_MB
}

fn default_log_timeout_secs() -> u64 {
    DEFAULT_LOG_TIMEOUT_SECS
}

fn default_storage_timeout_secs() -> u64 {
    DEFAULT_STORAGE_TIMEOUT_SECS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listening_port: default_listening_port(),
            bind_address: default_bind_address(),
            github_auth_token: None,
            github_api_url: default_github_api_url(),
            build_allowed_upload_label: default_allow_upload_label(),
            manifest_pattern: default_manifest_pattern(),
            max_upload_mb: default_max_upload_mb(),
            log_timeout_secs: default_log_timeout_secs(),
            storage_timeout_secs: default_storage_timeout_secs(),
            serialize_log_retrieval: false,
            repositories: BTreeMap::new(),
            storages: BTreeMap::new(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Starting point for a new deployment: one repository publishing to a
    /// local directory and to a public S3 bucket.
    pub fn example() -> Self {
        let mut config = Self {
            github_auth_token: Some("${GITHUB_TOKEN}".to_string()),
            ..Self::default()
        };

        config.storages.insert(
            "local".to_string(),
            StorageDefinition {
                method: StorageMethod::File,
                path: "/srv/builds/[:owner]/[:repo]/[:pull_number]/[:file_name]".to_string(),
                public_url: Some(
                    "https://builds.example.com/[:owner]/[:repo]/[:pull_number]/[:file_name]".to_string(),
                ),
                bucket: None,
                region: None,
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                acl: None,
            },
        );
        config.storages.insert(
            "s3".to_string(),
            StorageDefinition {
                method: StorageMethod::S3,
                path: "[:owner]/[:repo]/[:file_base_name]-[:short_commit_hash][:file_extension]".to_string(),
                public_url: Some(
                    "https://example-builds.s3.amazonaws.com/[:owner]/[:repo]/[:file_base_name]-[:short_commit_hash][:file_extension]"
                        .to_string(),
                ),
                bucket: Some("example-builds".to_string()),
                region: Some("us-east-1".to_string()),
                endpoint: None,
                access_key_id: Some("${AWS_ACCESS_KEY_ID}".to_string()),
                secret_access_key: Some("${AWS_SECRET_ACCESS_KEY}".to_string()),
                acl: Some("public-read".to_string()),
            },
        );
        config.repositories.insert(
            "octo/widgets".to_string(),
            RepositoryConfig {
                gh_notify_secret: Some("${WIDGETS_WEBHOOK_SECRET}".to_string()),
                storages: vec![
                    RepositoryStorage {
                        storage: "local".to_string(),
                        publish_url: false,
                    },
                    RepositoryStorage {
                        storage: "s3".to_string(),
                        publish_url: true,
                    },
                ],
            },
        );
        config
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML config")
    }

    /// Read, expand and validate; the only way the binary obtains a config.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_yaml_file(path)?;
        config.process_environment_variables();
        config.validate()?;
        info!(
            "Configuration loaded: {} repositories, {} storages",
            config.repositories.len(),
            config.storages.len()
        );
        Ok(config)
    }

    /// Expand `${VAR}` / `$VAR` in secrets, credentials and storage settings.
    pub fn process_environment_variables(&mut self) {
        expand_option(&mut self.github_auth_token);
        expand_in_place(&mut self.github_api_url);
        for repository in self.repositories.values_mut() {
            expand_option(&mut repository.gh_notify_secret);
        }
        for storage in self.storages.values_mut() {
            storage.process_environment_variables();
        }
    }

    /// Reject configurations that would only fail once a suite completes.
    pub fn validate(&self) -> Result<()> {
        ManifestResolver::new(&self.manifest_pattern)?;

        if self.max_upload_mb == 0 {
            bail!("max_upload_mb must be greater than zero");
        }

        for (name, storage) in &self.storages {
            storage
                .path_template()
                .with_context(|| format!("Storage '{}' has an invalid path", name))?;
            storage
                .public_url_template()
                .with_context(|| format!("Storage '{}' has an invalid public_url", name))?;

            if storage.method == StorageMethod::S3 && storage.bucket.as_deref().map_or(true, str::is_empty) {
                bail!("S3 storage '{}' has no bucket", name);
            }
        }

        for (full_name, repository) in &self.repositories {
            if RepoRef::from_full_name(full_name).is_none() {
                bail!("Repository key '{}' is not in owner/repo form", full_name);
            }

            for target in &repository.storages {
                let Some(storage) = self.storages.get(&target.storage) else {
                    bail!(
                        "Repository '{}' references undefined storage '{}'",
                        full_name,
                        target.storage
                    );
                };

                if target.publish_url && storage.method == StorageMethod::S3 && storage.public_url.is_none() {
                    bail!(
                        "Repository '{}' publishes URLs of S3 storage '{}' which has no public_url",
                        full_name,
                        target.storage
                    );
                }
            }
        }

        Ok(())
    }

    pub fn repository(&self, repo: &RepoRef) -> Option<&RepositoryConfig> {
        self.repositories.get(&repo.full_name())
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
