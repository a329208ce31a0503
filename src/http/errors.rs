use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::admission::AdmissionError;
use crate::pagination::PaginationError;
use crate::scan_events::EventBusError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] PaginationError),

    #[error("No idle worker available")]
    Unavailable,

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable | ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::ScanFailed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "request_error",
            ApiError::Unavailable => "unavailable",
            ApiError::ScanFailed(_) => "scan_failed",
            ApiError::Timeout => "timeout",
            ApiError::ShuttingDown => "shutting_down",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<EventBusError> for ApiError {
    fn from(e: EventBusError) -> Self {
        match e {
            EventBusError::Shutdown => ApiError::ShuttingDown,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::BadRequest(e) => Some(e.to_string()),
            ApiError::ScanFailed(reason) => Some(reason.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
