use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors the edge layer and its demo handlers turn into HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code used in the response body
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::RateLimited { .. } => "too_many_requests",
            AppError::NotFound { .. } => "not_found",
            AppError::Internal { .. } => "internal_error",
        }
    }

    pub fn should_log_as_error(&self) -> bool {
        matches!(self, AppError::Internal { .. })
    }

    /// Rate limit rejections stay off the log so a flood cannot amplify into it
    pub fn should_log(&self) -> bool {
        !matches!(self, AppError::RateLimited { .. })
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse { error: self.error_code().to_string(), message: self.to_string() }
    }
}

/// JSON error body: `{"error": "<code>", "message": "<text>"}`
#[derive(Serialize, Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_error_response();

        if self.should_log_as_error() {
            error!(error_code = self.error_code(), "Application error: {}", self);
        } else if self.should_log() {
            warn!(error_code = self.error_code(), "Application warning: {}", self);
        }

        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
