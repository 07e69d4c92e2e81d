use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::{AdmissionError, DemuxError, SignatureError};

/// Failure surfaced synchronously to an HTTP caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    BadGateway(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<DemuxError> for ApiError {
    fn from(err: DemuxError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::RepositoryNotAllowed(_)
            | AdmissionError::UploadNotPermitted(_)
            | AdmissionError::CommitNotInPullRequest(_) => ApiError::Forbidden(message),
            AdmissionError::CheckRunNotFound { .. } => ApiError::NotFound(message),
            AdmissionError::Provider(_) => ApiError::BadGateway(message),
        }
    }
}

/// Every notification that cannot be authenticated gets the same answer;
/// the specific reason is only logged.
impl From<SignatureError> for ApiError {
    fn from(_: SignatureError) -> Self {
        ApiError::Unauthorized("notification could not be authenticated".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = DemuxError::Overflow { expected: 3 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = AdmissionError::UploadNotPermitted("allow-build-upload".into()).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = AdmissionError::Provider("timeout".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = SignatureError::Mismatch.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = SignatureError::MalformedPayload("eof".into()).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_signature_rejections_are_indistinguishable() {
        let rejections = [
            SignatureError::MissingHeader,
            SignatureError::Mismatch,
            SignatureError::UnknownRepository("octo/other".into()),
            SignatureError::MalformedPayload("missing repository.full_name".into()),
        ];
        let messages: Vec<String> = rejections
            .into_iter()
            .map(|e| ApiError::from(e).to_string())
            .collect();
        assert!(messages.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::NotFound("no check run".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
