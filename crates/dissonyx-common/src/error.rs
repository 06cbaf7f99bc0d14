use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DissonyxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Submission timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DissonyxError>;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl From<DissonyxError> for ApiError {
    fn from(err: DissonyxError) -> Self {
        match err {
            DissonyxError::EntityNotFound(what) => ApiError::not_found(what),
            DissonyxError::InvalidSubmission(msg) => Self { status: StatusCode::BAD_REQUEST, message: msg },
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let api: ApiError = DissonyxError::EntityNotFound("paper foo".to_string()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "paper foo");
    }

    #[test]
    fn test_timeout_message() {
        let err = DissonyxError::Timeout(30);
        assert_eq!(err.to_string(), "Submission timed out after 30s");
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
