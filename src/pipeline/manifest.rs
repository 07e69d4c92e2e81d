use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MANIFEST_PATTERN;
use crate::error::ResolveError;
use crate::models::{ArtifactBlob, ResolvedArtifact};
use crate::utils::hash::hashes_equal;

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = Regex::new(DEFAULT_MANIFEST_PATTERN).unwrap();
}

/// One `{filename, sha256_checksum}` record of a build manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    #[serde(rename = "sha256_checksum")]
    pub content_hash: String,
}

/// Ordered list of filename/hash pairs scraped from a job log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Filename paired with `hash`.
    ///
    /// Linear scan, first listed entry wins when a hash appears twice.
    pub fn lookup(&self, hash: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| hashes_equal(&entry.content_hash, hash))
            .map(|entry| entry.filename.as_str())
    }
}

/// Extracts the embedded manifest from CI log text and maps artifact hashes to names.
///
/// The manifest is the JSON array captured by group 1 of the marker pattern
/// on the first matching line.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    pattern: Regex,
}

impl Default for ManifestResolver {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

impl ManifestResolver {
    /// Build a resolver from a marker pattern with at least one capture group.
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| anyhow::anyhow!("Invalid manifest pattern '{}': {}", pattern, e))?;
        if pattern.captures_len() < 2 {
            anyhow::bail!("Manifest pattern '{}' has no capture group", pattern.as_str());
        }
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Parse the manifest out of raw log text.
    pub fn extract(&self, log_text: &str) -> Result<Manifest, ResolveError> {
        let captured = self
            .pattern
            .captures(log_text)
            .and_then(|caps| caps.get(1))
            .ok_or(ResolveError::ManifestMissing)?;

        let entries: Vec<ManifestEntry> = serde_json::from_str(captured.as_str())
            .map_err(|e| ResolveError::ManifestMalformed(e.to_string()))?;

        let manifest = Manifest::new(entries);
        debug!("Parsed build manifest with {} entries", manifest.entries().len());
        Ok(manifest)
    }

    /// Resolve one artifact hash to its canonical filename.
    pub fn resolve(&self, log_text: &str, artifact_hash: &str) -> Result<String, ResolveError> {
        let manifest = self.extract(log_text)?;
        manifest
            .lookup(artifact_hash)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::HashNotFound(artifact_hash.to_string()))
    }

    /// Resolve every artifact of one upload, all or nothing.
    ///
    /// A single unresolvable hash fails the whole set so nothing is ever
    /// published under a wrong or missing name.
    pub fn resolve_all(
        &self,
        log_text: &str,
        artifacts: &[ArtifactBlob],
    ) -> Result<Vec<ResolvedArtifact>, ResolveError> {
        let manifest = self.extract(log_text)?;
        let mut resolved = Vec::with_capacity(artifacts.len());

        for blob in artifacts {
            debug!("Looking for the filename of artifact with the hash {}", blob.content_hash);
            let Some(file_name) = manifest.lookup(&blob.content_hash) else {
                warn!("Failed to find build hash {} in manifest", blob.content_hash);
                return Err(ResolveError::HashNotFound(blob.content_hash.clone()));
            };
            info!("Found {} with hash {}", file_name, blob.content_hash);
            resolved.push(ResolvedArtifact::new(blob.clone(), file_name));
        }

        Ok(resolved)
    }
}
