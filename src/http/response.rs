//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::stacks::StacksError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by API handlers as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = %self.message, "API request failed");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<StacksError> for ApiError {
    fn from(e: StacksError) -> Self {
        let status = match &e {
            StacksError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            StacksError::Rejected(_) | StacksError::Clarity(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Stacks(inner) => inner.into(),
            StoreError::NotAuthenticated => Self::new(StatusCode::UNAUTHORIZED, e.to_string()),
            StoreError::MessageNotFound(_) => Self::not_found(e.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }
}
