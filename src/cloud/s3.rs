use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use log::{debug, warn};
use rusoto_core::{ByteStream, Region};
use rusoto_s3::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompletedMultipartUpload,
    CompletedPart, CreateMultipartUploadRequest, PutObjectRequest, S3Client, UploadPartRequest, S3,
};

use crate::cloud::client::{create_s3_client, resolve_region};
use crate::cloud::ObjectStore;
use crate::constants::{LARGE_FILE_THRESHOLD, MAX_CONCURRENT_PARTS, S3_UPLOAD_CHUNK_SIZE};
use crate::security::path_validator::validate_object_key;

/// Connection settings of one S3 storage.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    /// Canned ACL applied to every object, e.g. `public-read`
    pub acl: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Publishes artifacts as objects in an S3 bucket.
///
/// Artifacts at or below [`LARGE_FILE_THRESHOLD`] go up in a single
/// `PutObject`; larger ones use a multipart upload with at most
/// [`MAX_CONCURRENT_PARTS`] parts in flight. A failed part aborts the whole
/// multipart upload. Nothing is retried here; the publisher owns the
/// timeout policy.
pub struct S3Store {
    bucket: String,
    acl: Option<String>,
    region: Region,
    client: Arc<S3Client>,
}

impl S3Store {
    pub fn new(settings: &S3Settings) -> Result<Self> {
        let region = resolve_region(settings.region.as_deref(), settings.endpoint.as_deref());
        let credentials = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            (None, None) => None,
            _ => {
                warn!(
                    "Bucket '{}' has only one of access key id / secret, using default credentials",
                    settings.bucket
                );
                None
            }
        };
        let client = create_s3_client(region.clone(), credentials)?;

        Ok(Self {
            bucket: settings.bucket.clone(),
            acl: settings.acl.clone(),
            region,
            client,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    async fn put_small(&self, key: &str, data: Bytes) -> Result<()> {
        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            acl: self.acl.clone(),
            content_length: Some(data.len() as i64),
            body: Some(ByteStream::from(data.to_vec())),
            ..Default::default()
        };

        self.client
            .put_object(request)
            .await
            .map_err(|e| anyhow!("PutObject failed: {}", e))?;
        Ok(())
    }

    async fn put_multipart(&self, key: &str, data: Bytes) -> Result<()> {
        let create_result = self
            .client
            .create_multipart_upload(CreateMultipartUploadRequest {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                acl: self.acl.clone(),
                ..Default::default()
            })
            .await
            .context("Failed to initialize multipart upload")?;

        let upload_id = create_result
            .upload_id
            .ok_or_else(|| anyhow!("No upload ID returned from S3"))?;

        let ranges = part_ranges(data.len(), S3_UPLOAD_CHUNK_SIZE);
        debug!("Started multipart upload {} for {} ({} parts)", upload_id, key, ranges.len());

        match self.upload_parts(key, &upload_id, &data, &ranges).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload(CompleteMultipartUploadRequest {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                        upload_id: upload_id.clone(),
                        multipart_upload: Some(CompletedMultipartUpload { parts: Some(parts) }),
                        ..Default::default()
                    })
                    .await
                    .context("Failed to complete multipart upload")?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload(AbortMultipartUploadRequest {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                        upload_id: upload_id.clone(),
                        ..Default::default()
                    })
                    .await
                {
                    warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
                }
                Err(anyhow!("Part upload failed, aborted multipart upload: {}", e))
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        data: &Bytes,
        ranges: &[(usize, usize)],
    ) -> Result<Vec<CompletedPart>> {
        let mut completed = Vec::with_capacity(ranges.len());

        for (batch_index, batch) in ranges.chunks(MAX_CONCURRENT_PARTS).enumerate() {
            let futures = batch.iter().enumerate().map(|(offset, &(start, end))| {
                let part_number = (batch_index * MAX_CONCURRENT_PARTS + offset + 1) as i64;
                let request = UploadPartRequest {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                    upload_id: upload_id.to_string(),
                    part_number,
                    content_length: Some((end - start) as i64),
                    body: Some(ByteStream::from(data.slice(start..end).to_vec())),
                    ..Default::default()
                };
                let client = Arc::clone(&self.client);

                async move {
                    let output = client
                        .upload_part(request)
                        .await
                        .map_err(|e| anyhow!("Part {} failed: {}", part_number, e))?;
                    let e_tag = output
                        .e_tag
                        .ok_or_else(|| anyhow!("No ETag in upload part response"))?;
                    Ok::<_, anyhow::Error>(CompletedPart {
                        e_tag: Some(e_tag),
                        part_number: Some(part_number),
                    })
                }
            });

            for part in future::join_all(futures).await {
                completed.push(part?);
            }
        }

        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn describe(&self, destination: &str) -> String {
        let key = validate_object_key(destination).unwrap_or_else(|_| destination.to_string());
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn put(&self, destination: &str, data: Bytes) -> Result<()> {
        let key = validate_object_key(destination)?;
        let size = data.len() as u64;
        let start_time = Instant::now();

        if size > LARGE_FILE_THRESHOLD {
            self.put_multipart(&key, data).await?;
        } else {
            self.put_small(&key, data).await?;
        }

        debug!(
            "Uploaded {} bytes to s3://{}/{} in {:?}",
            size,
            self.bucket,
            key,
            start_time.elapsed()
        );
        Ok(())
    }
}

/// Byte ranges of the parts of a multipart upload.
fn part_ranges(len: usize, part_size: usize) -> Vec<(usize, usize)> {
    (0..len)
        .step_by(part_size.max(1))
        .map(|start| (start, (start + part_size).min(len)))
        .collect()
}
