//! Error types for the custom test API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::form::ValidationError;
use crate::judge0::JudgeError;

pub const PAGE_TITLE: &str = "Custom Test";
pub const COMING_SOON_MESSAGE: &str = "This feature is coming soon! Stay tuned for updates.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// No or unknown bearer token
    #[error("Authentication required")]
    Unauthenticated,

    /// Page view without the test_site permission
    #[error("Custom test is not available for this user")]
    ComingSoon,

    #[error("Permission denied")]
    Forbidden,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Judge0 call failed: {0}")]
    Judge(#[from] JudgeError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::ComingSoon | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Judge(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::ComingSoon => json!({
                "title": PAGE_TITLE,
                "message": COMING_SOON_MESSAGE,
            }),
            // Validation details stay in the logs
            ApiError::Validation(_) => json!({ "error": "Invalid input" }),
            ApiError::Judge(_) => json!({ "error": "Judge0 call failed" }),
            ApiError::Store(e) => {
                error!(error = %e, "Store operation failed");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
