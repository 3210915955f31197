use std::time::Duration;

use thiserror::Error;

use crate::application::services::retry::is_retryable_error;

/// Failure of a single call to the storage provider.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("provider responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("request cancelled")]
    Cancelled,
}

impl StorageError {
    /// Transport failures are always retryable; provider statuses go through the
    /// message classifier.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::Network(_) | StorageError::Timeout(_) => true,
            StorageError::Cancelled => false,
            StorageError::Status { .. } | StorageError::InvalidResponse(_) => {
                is_retryable_error(&self.to_string())
            }
        }
    }

    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            StorageError::Timeout(timeout)
        } else if error.is_connect() {
            StorageError::Network(format!("connection failed: {}", error))
        } else if error.is_decode() {
            StorageError::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            StorageError::Status {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            StorageError::Network(error.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment provider responded with status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(StorageError::Network("connection reset by peer".into()).is_retryable());
        assert!(StorageError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn status_errors_follow_the_classifier() {
        let busy = StorageError::Status {
            status: 503,
            body: r#"{"code":"service_unavailable","message":"c001_v0001 no tomes available"}"#
                .into(),
        };
        assert!(busy.is_retryable());

        let unauthorized = StorageError::Status {
            status: 401,
            body: r#"{"code":"unauthorized","message":"bad key"}"#.into(),
        };
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn cancellation_is_never_retried() {
        assert!(!StorageError::Cancelled.is_retryable());
    }
}
