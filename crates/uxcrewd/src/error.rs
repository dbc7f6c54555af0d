//! HTTP error envelope: `{"error": {"code", "message", ...}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use artifact_store::StoreError;
use uxcrew_core::{DomainError, GenerationError, Stage};
use uxcrew_pipeline::{PipelineFailure, StageError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            stage: None,
            artifact_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self }))).into_response()
    }
}

fn generation_status(err: &GenerationError) -> (StatusCode, &'static str) {
    match err {
        GenerationError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "generation_timeout"),
        GenerationError::Quota(_) => (StatusCode::TOO_MANY_REQUESTS, "generation_quota"),
        GenerationError::MissingCredential(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
        }
        _ => (StatusCode::BAD_GATEWAY, "generation_failed"),
    }
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        let artifact_id = err.artifact_id().map(ToString::to_string);
        let (status, code) = match &err {
            StageError::Generation(g) => generation_status(g),
            StageError::UnparseableResponse { .. } => {
                (StatusCode::BAD_GATEWAY, "unparseable_response")
            }
            StageError::Rejected { .. } => (StatusCode::BAD_GATEWAY, "validation_rejected"),
            StageError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StageError::MissingInput { .. }
            | StageError::Storage(_)
            | StageError::Encoding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self {
            artifact_id,
            ..Self::new(status, code, err.to_string())
        }
    }
}

impl From<PipelineFailure> for ApiError {
    fn from(failure: PipelineFailure) -> Self {
        let message = failure.to_string();
        let mut api = ApiError::from(failure.error);
        api.message = message;
        api.stage = Some(failure.stage);
        api
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::not_found(err.to_string()),
            StoreError::InvalidId { .. } => ApiError::bad_request(err.to_string()),
            StoreError::Conflict(_) => ApiError::new(StatusCode::CONFLICT, "conflict", err.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "invalid_image", err.to_string())
    }
}
