use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use uuid::Uuid;

use crate::cloud::ObjectStore;
use crate::security::path_validator::validate_destination;

/// Writes artifacts to the local filesystem.
///
/// Missing parent directories are created. The file is written to a
/// temporary sibling first and renamed into place, so a reader never sees a
/// partially written artifact and an existing file is replaced atomically.
#[derive(Debug, Default, Clone)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ObjectStore for LocalFileStore {
    fn describe(&self, destination: &str) -> String {
        format!("file://{}", destination)
    }

    async fn put(&self, destination: &str, data: Bytes) -> Result<()> {
        let path = validate_destination(Path::new(destination))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = path.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, &data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e).with_context(|| format!("Failed to write {}", staging.display()));
        }

        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e).with_context(|| format!("Failed to move artifact into {}", path.display()));
        }

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}
