use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the aggregation endpoints.
///
/// Each variant maps to a specific HTTP status code and produces the
/// `{"error": ...}` JSON body the pins widget renders in its loading UI.
/// The music and activity handlers never surface this type to the client;
/// they collapse failures into their safe-default payloads instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Username is required")]
    MissingUsername,

    #[error("GitHub token not configured")]
    GithubTokenMissing,

    #[error("Failed to fetch pinned repositories")]
    PinnedFetchFailed,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MissingUsername => (StatusCode::BAD_REQUEST, "Username is required"),
            AppError::GithubTokenMissing => {
                (StatusCode::INTERNAL_SERVER_ERROR, "GitHub token not configured")
            }
            // Transport errors only ever reach the client from the pins
            // route, which promises this exact body on upstream failure.
            AppError::PinnedFetchFailed | AppError::HttpClient(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch pinned repositories",
            ),
        };

        let body = Json(json!({ "error": error_message }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
