use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{
    HEADER_COMMIT_HASH, HEADER_FILE_SIZES, HEADER_JOB_NAME, HEADER_OWNER, HEADER_PULL_NUMBER,
    HEADER_REPO, HEADER_RUN_ID,
};
use crate::models::{RepoRef, UploadContext, UploadIdentity};
use crate::pipeline::{checked_total, demultiplex, resolve_suite};
use crate::server::error::{ApiError, ApiResult};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub success: bool,
    pub message: String,
    pub upload_id: String,
    pub files: Vec<UploadedFile>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> ApiResult<&'a str> {
    let value = headers
        .get(name)
        .ok_or_else(|| ApiError::BadRequest(format!("missing header '{}'", name)))?
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("header '{}' is not valid text", name)))?
        .trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("header '{}' is empty", name)));
    }
    Ok(value)
}

fn numeric_header(headers: &HeaderMap, name: &str) -> ApiResult<u64> {
    header(headers, name)?
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("header '{}' is not a number", name)))
}

/// Comma-separated byte lengths, in body order.
pub fn parse_file_sizes(value: &str) -> ApiResult<Vec<u64>> {
    let sizes = value
        .split(',')
        .map(|s| s.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::BadRequest(format!("invalid '{}' header: {}", HEADER_FILE_SIZES, value)))?;
    Ok(sizes)
}

/// Identity and declared lengths carried by the request headers.
pub fn parse_upload_headers(headers: &HeaderMap) -> ApiResult<(UploadIdentity, Vec<u64>)> {
    let identity = UploadIdentity {
        repository: RepoRef::new(header(headers, HEADER_OWNER)?, header(headers, HEADER_REPO)?),
        commit_hash: header(headers, HEADER_COMMIT_HASH)?.to_string(),
        pull_number: numeric_header(headers, HEADER_PULL_NUMBER)?,
        job_name: header(headers, HEADER_JOB_NAME)?.to_string(),
        run_id: numeric_header(headers, HEADER_RUN_ID)?,
    };
    let sizes = parse_file_sizes(header(headers, HEADER_FILE_SIZES)?)?;
    Ok((identity, sizes))
}

/// `PUT /`
///
/// Admission runs before the body is touched. The body is demultiplexed
/// entirely in memory and only a fully demultiplexed upload is queued under
/// its check suite.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<UploadAccepted>)> {
    let (identity, declared) = parse_upload_headers(&headers)?;
    let upload_id = Uuid::new_v4().to_string();

    let declared_total = checked_total(&declared).ok_or_else(|| {
        ApiError::PayloadTooLarge(format!("declared sizes in '{}' exceed any upload limit", HEADER_FILE_SIZES))
    })?;
    if declared_total > state.config.max_upload_bytes() {
        return Err(ApiError::PayloadTooLarge(format!(
            "declared upload of {} bytes exceeds the {} MB limit",
            declared_total, state.config.max_upload_mb
        )));
    }

    state.gate.admit(state.ci.as_ref(), &identity).await?;

    info!(
        "Upload {} from {}#{} job '{}': {} files, {} bytes",
        upload_id,
        identity.repository,
        identity.pull_number,
        identity.job_name,
        declared.len(),
        declared_total
    );

    let artifacts = demultiplex(declared.clone(), body.into_data_stream()).await?;
    let suite_id = resolve_suite(state.ci.as_ref(), &identity).await?;

    let files = artifacts
        .iter()
        .map(|a| UploadedFile {
            size: a.len(),
            sha256: a.content_hash.clone(),
        })
        .collect();

    let context = UploadContext {
        upload_id: upload_id.clone(),
        identity,
        declared_lengths: declared,
        artifacts,
    };
    state.aggregator.enqueue(suite_id, context);

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            success: true,
            message: "Publishing procedure started, links are published once the workflow finishes."
                .to_string(),
            upload_id,
            files,
        }),
    ))
}
