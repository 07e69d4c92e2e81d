use serde::{Deserialize, Serialize};

use crate::cloud::s3::S3Settings;
use crate::config::env_vars::{expand_in_place, expand_option};
use crate::error::TemplateError;
use crate::pipeline::template::PathTemplate;

/// Kind of storage backend.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StorageMethod {
    #[serde(rename = "file", alias = "File")]
    File,
    #[serde(rename = "S3", alias = "s3")]
    S3,
}

/// A named global storage definition.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageDefinition {
    pub method: StorageMethod,
    /// Destination template: a filesystem path or an object key
    pub path: String,
    /// Template of the URL reported for published artifacts
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, alias = "accessKeyId")]
    pub access_key_id: Option<String>,
    #[serde(default, alias = "secretAccessKey")]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub acl: Option<String>,
}

impl StorageDefinition {
    pub fn path_template(&self) -> Result<PathTemplate, TemplateError> {
        PathTemplate::parse(&self.path)
    }

    pub fn public_url_template(&self) -> Result<Option<PathTemplate>, TemplateError> {
        self.public_url.as_deref().map(PathTemplate::parse).transpose()
    }

    /// S3 connection settings; `None` for non-S3 storages or a missing bucket.
    pub fn s3_settings(&self) -> Option<S3Settings> {
        if self.method != StorageMethod::S3 {
            return None;
        }
        Some(S3Settings {
            bucket: self.bucket.clone()?,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            acl: self.acl.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        })
    }

    pub(crate) fn process_environment_variables(&mut self) {
        expand_in_place(&mut self.path);
        expand_option(&mut self.public_url);
        expand_option(&mut self.bucket);
        expand_option(&mut self.region);
        expand_option(&mut self.endpoint);
        expand_option(&mut self.access_key_id);
        expand_option(&mut self.secret_access_key);
    }
}

/// A repository's reference to a global storage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RepositoryStorage {
    /// Key into the global `storages` map
    pub storage: String,
    /// Whether writes to this storage are listed in the report
    #[serde(default)]
    pub publish_url: bool,
}
