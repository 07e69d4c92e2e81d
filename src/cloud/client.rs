use std::sync::Arc;

use anyhow::{Context, Result};
use log::warn;
use rusoto_core::{HttpClient, Region};
use rusoto_credential::{DefaultCredentialsProvider, StaticProvider};
use rusoto_s3::S3Client;

/// Resolve the region of an S3 storage.
///
/// A custom endpoint (S3-compatible services) takes precedence; an invalid
/// region name falls back to the default region.
pub fn resolve_region(region_name: Option<&str>, endpoint: Option<&str>) -> Region {
    if let Some(endpoint) = endpoint {
        return Region::Custom {
            name: region_name.unwrap_or("us-east-1").to_string(),
            endpoint: endpoint.to_string(),
        };
    }

    match region_name {
        Some(name) => match name.parse::<Region>() {
            Ok(r) => r,
            Err(_) => {
                warn!("Invalid region '{}', using default", name);
                Region::default()
            }
        },
        None => Region::default(),
    }
}

/// Create an S3 client with static credentials, or the default provider chain
/// when none are configured.
pub fn create_s3_client(region: Region, credentials: Option<(String, String)>) -> Result<Arc<S3Client>> {
    let http_client = HttpClient::new().context("Failed to create HTTP client")?;

    let client = match credentials {
        Some((access_key_id, secret_access_key)) => S3Client::new_with(
            http_client,
            StaticProvider::new_minimal(access_key_id, secret_access_key),
            region,
        ),
        None => {
            let provider = DefaultCredentialsProvider::new()
                .context("Failed to create AWS credentials provider")?;
            S3Client::new_with(http_client, provider, region)
        }
    };

    Ok(Arc::new(client))
}
