use thiserror::Error;

use crate::{application::services::retry::is_retryable_error, services::StorageError};

#[derive(Debug)]
pub enum ApplicationError {
    NotFound,
    InternalError(String),
    DatabaseError(String),
    BadRequest(String),
    Unauthorized,
    Conflict(String),
    Upload(UploadError),
}

impl From<validator::ValidationErrors> for ApplicationError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApplicationError::BadRequest(format!("Validation error: {}", err))
    }
}

impl From<UploadError> for ApplicationError {
    fn from(error: UploadError) -> Self {
        ApplicationError::Upload(error)
    }
}

/// Terminal failure of the upload pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Storage is not configured: {0}")]
    Configuration(String),

    #[error("Authorization failed: {0}")]
    Authorization(#[source] StorageError),

    #[error("Upload URL allocation failed: {0}")]
    Allocation(#[source] StorageError),

    #[error("Transfer failed: {0}")]
    Transfer(#[source] StorageError),

    #[error("Upload failed after {attempts} attempts: {last}")]
    BudgetExhausted {
        attempts: u32,
        #[source]
        last: Box<UploadError>,
    },

    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Whether a client resubmitting later has a reasonable chance of success.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Configuration(_) | UploadError::Cancelled => false,
            _ => is_retryable_error(&self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_budget_keeps_last_error_classification() {
        let error = UploadError::BudgetExhausted {
            attempts: 5,
            last: Box::new(UploadError::Allocation(StorageError::Status {
                status: 503,
                body: "service_unavailable".into(),
            })),
        };

        assert!(error.is_retryable());
        assert!(error.to_string().contains("after 5 attempts"));
    }

    #[test]
    fn configuration_errors_are_not_retryable() {
        let error = UploadError::Configuration("environment variable B2_KEY_ID must be set".into());
        assert!(!error.is_retryable());
    }
}
