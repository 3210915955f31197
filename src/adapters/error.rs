use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::application::error::{ApplicationError, UploadError};

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApplicationError::NotFound => {
                warn!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            ApplicationError::BadRequest(msg) => {
                warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            ApplicationError::Unauthorized => {
                warn!("Unauthorized access attempt");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ApplicationError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg)
            }
            ApplicationError::InternalError(ref msg) => {
                error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApplicationError::DatabaseError(ref msg) => {
                error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApplicationError::Upload(err) => return upload_failure(err),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

fn upload_failure(err: UploadError) -> Response {
    let retryable = err.is_retryable();
    let status = if retryable {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error!(retryable, "Upload failed: {:?}", err);

    let details = match &err {
        UploadError::Configuration(_) => "File storage is not configured".to_string(),
        UploadError::Cancelled => "The upload was cancelled".to_string(),
        other => other.to_string(),
    };

    let body = Json(json!({
        "error": "Failed to upload file",
        "details": details,
        "retryable": retryable,
    }));

    (status, body).into_response()
}
