use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// A feature the request needs was not imported
    Unavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<stepfree_core::Error> for ApiError {
    fn from(e: stepfree_core::Error) -> Self {
        match e {
            stepfree_core::Error::UnknownElevator(_) => ApiError::NotFound(e.to_string()),
            stepfree_core::Error::InvalidData(_) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            tracing::error!(%status, "{message}");
        } else {
            tracing::debug!(%status, "{message}");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
