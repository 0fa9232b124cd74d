use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::geo::GeoError;
use crate::llm::assistant::AssistantError;


#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}


#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Unprocessable(detail) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", detail),
            ApiError::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", detail),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "Upstream service failed");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::EmptyMessage => ApiError::Unprocessable(err.to_string()),
            AssistantError::EmptyResponse(_) | AssistantError::Provider(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidCoordinates { .. } => ApiError::BadRequest(err.to_string()),
            GeoError::Http(_) | GeoError::Service(_) => ApiError::Upstream(err.to_string()),
            GeoError::Url(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<crate::storage::StorageError> for ApiError {
    fn from(err: crate::storage::StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Unavailable("no llm".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(AssistantError::EmptyMessage).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(GeoError::InvalidCoordinates { lat: 91.0, lon: 0.0 })
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
