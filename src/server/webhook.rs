use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::constants::{CHECK_SUITE_COMPLETED, CHECK_SUITE_EVENT, HEADER_GITHUB_EVENT, HEADER_HUB_SIGNATURE_256};
use crate::error::SignatureError;
use crate::models::{RepoRef, SuiteId};
use crate::security::signature::verify_signature;
use crate::server::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct CheckSuitePayload {
    id: SuiteId,
}

#[derive(Debug, Deserialize)]
struct NotificationPayload {
    #[serde(default)]
    action: Option<String>,
    repository: Option<RepositoryPayload>,
    #[serde(default)]
    check_suite: Option<CheckSuitePayload>,
}

/// Authenticate a notification against its repository's secret.
fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<NotificationPayload, SignatureError> {
    let payload: NotificationPayload =
        serde_json::from_slice(body).map_err(|e| SignatureError::MalformedPayload(e.to_string()))?;
    let full_name = payload
        .repository
        .as_ref()
        .map(|r| r.full_name.as_str())
        .ok_or_else(|| SignatureError::MalformedPayload("missing repository.full_name".to_string()))?;

    let secret = RepoRef::from_full_name(full_name)
        .and_then(|repo| state.config.repository(&repo))
        .and_then(|r| r.gh_notify_secret.as_deref())
        .ok_or_else(|| SignatureError::UnknownRepository(full_name.to_string()))?;

    let signature = headers
        .get(HEADER_HUB_SIGNATURE_256)
        .and_then(|v| v.to_str().ok());
    verify_signature(secret.as_bytes(), body, signature)?;

    Ok(payload)
}

/// `POST /webhook`
///
/// Nothing is drained unless the signature verifies. A completed check suite
/// is drained synchronously and processed in a background task, so the
/// response does not wait for log retrieval or storage writes.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payload = authenticate(&state, &headers, &body).map_err(|e| {
        warn!("Rejected webhook notification: {}", e);
        e
    })?;

    let event = headers
        .get(HEADER_GITHUB_EVENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let action = payload.action.as_deref().unwrap_or_default();

    let suite_id = match (&payload.check_suite, event, action) {
        (Some(suite), CHECK_SUITE_EVENT, CHECK_SUITE_COMPLETED) => suite.id,
        _ => {
            debug!("Ignoring '{}' event with action '{}'", event, action);
            return Ok((StatusCode::OK, Json(json!({ "success": true, "message": "event ignored" }))));
        }
    };

    let batch = state.aggregator.drain(suite_id);
    let uploads = batch.len();
    if uploads > 0 {
        let processor = state.processor.clone();
        tokio::spawn(async move {
            let summary = processor.process(suite_id, batch).await;
            let failed = summary.outcomes.iter().filter(|o| o.result.is_err()).count();
            info!(
                "Check suite {} done: {} jobs, {} failed, {} URLs, report posted: {}",
                summary.suite_id,
                summary.outcomes.len(),
                failed,
                summary.report.url_count(),
                summary.reported
            );
        });
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "check suite completed, publishing started",
            "suite_id": suite_id,
            "uploads": uploads,
        })),
    ))
}
