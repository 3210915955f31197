use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    application::{
        error::UploadError,
        services::{
            retry::{sleep_or_cancel, BackoffPolicy},
            storage_service::ObjectStorage,
        },
    },
    domain::models::upload::{
        AttemptOutcome, AttemptRecord, AuthorizationContext, StoredObject, UniqueObjectName,
        UploadRequest, UploadedObject,
    },
    services::StorageError,
};

/// Coordinates authorize -> (allocate -> transfer)* for one upload request.
///
/// Authorization happens once per run. Every loop attempt allocates a fresh
/// one-time target, since a failed transfer invalidates the previous one. The
/// object name is computed once so that retries overwrite the same key.
///
/// Failures the classifier does not consider transient are still retried, with
/// `fallback_delay` instead of the exponential schedule. Only exhausting the
/// attempt budget (or cancellation) ends the loop early.
pub struct UploadPipeline {
    storage: Arc<dyn ObjectStorage>,
    policy: BackoffPolicy,
}

impl UploadPipeline {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self::with_policy(storage, BackoffPolicy::pipeline())
    }

    pub fn with_policy(storage: Arc<dyn ObjectStorage>, policy: BackoffPolicy) -> Self {
        Self { storage, policy }
    }

    pub async fn run(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadedObject, UploadError> {
        self.run_with_records(request, cancel).await.0
    }

    /// Same as [`run`](Self::run), also returning one record per loop attempt.
    pub async fn run_with_records(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> (Result<UploadedObject, UploadError>, Vec<AttemptRecord>) {
        let mut records: Vec<AttemptRecord> = Vec::with_capacity(self.policy.max_attempts as usize);
        let object_name = UniqueObjectName::generate(request.file_name());
        info!(
            object_name = %object_name,
            size = request.size(),
            content_type = request.content_type(),
            "Starting upload"
        );

        let auth = match self.storage.authorize(cancel).await {
            Ok(auth) => auth,
            Err(e) => {
                let err = match e {
                    StorageError::Cancelled => UploadError::Cancelled,
                    other => UploadError::Authorization(other),
                };
                error!("Upload of {} aborted: {}", object_name, err);
                return (Err(err), records);
            }
        };

        let result = self
            .attempt_loop(request, &auth, &object_name, cancel, &mut records)
            .await;
        log_attempts(&object_name, &records);
        (result, records)
    }

    async fn attempt_loop(
        &self,
        request: &UploadRequest,
        auth: &AuthorizationContext,
        object_name: &UniqueObjectName,
        cancel: &CancellationToken,
        records: &mut Vec<AttemptRecord>,
    ) -> Result<UploadedObject, UploadError> {
        let mut delay_before = Duration::ZERO;

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(request, auth, object_name, cancel).await {
                Ok(stored) => {
                    records.push(AttemptRecord {
                        attempt,
                        delay_before,
                        outcome: AttemptOutcome::Succeeded,
                        error: None,
                    });
                    info!(
                        object_name = %object_name,
                        file_id = %stored.file_id,
                        attempts = attempt,
                        "Upload succeeded"
                    );
                    return Ok(self.finish(auth, object_name, request, stored));
                }
                Err(UploadError::Cancelled) => {
                    warn!("Upload of {} cancelled on attempt {}", object_name, attempt);
                    return Err(UploadError::Cancelled);
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    records.push(AttemptRecord {
                        attempt,
                        delay_before,
                        outcome: if retryable {
                            AttemptOutcome::RetryableFailure
                        } else {
                            AttemptOutcome::FatalFailure
                        },
                        error: Some(err.to_string()),
                    });

                    if attempt == self.policy.max_attempts {
                        error!(
                            object_name = %object_name,
                            attempts = attempt,
                            "Upload failed, attempt budget exhausted"
                        );
                        return Err(UploadError::BudgetExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }

                    delay_before = if retryable {
                        self.policy.delay_for(attempt)
                    } else {
                        self.policy.fallback_delay
                    };
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        retryable,
                        delay_ms = delay_before.as_millis() as u64,
                        "Upload attempt failed: {}",
                        err
                    );

                    sleep_or_cancel(delay_before, cancel)
                        .await
                        .map_err(|_| UploadError::Cancelled)?;
                }
            }
        }

        // max_attempts == 0
        Err(UploadError::BudgetExhausted {
            attempts: 0,
            last: Box::new(UploadError::Configuration(
                "attempt budget must be at least 1".to_string(),
            )),
        })
    }

    async fn attempt(
        &self,
        request: &UploadRequest,
        auth: &AuthorizationContext,
        object_name: &UniqueObjectName,
        cancel: &CancellationToken,
    ) -> Result<StoredObject, UploadError> {
        let target = self
            .storage
            .allocate_upload_target(auth, cancel)
            .await
            .map_err(|e| match e {
                StorageError::Cancelled => UploadError::Cancelled,
                other => UploadError::Allocation(other),
            })?;

        self.storage
            .transfer(request, target, object_name, cancel)
            .await
            .map_err(|e| match e {
                StorageError::Cancelled => UploadError::Cancelled,
                other => UploadError::Transfer(other),
            })
    }

    fn finish(
        &self,
        auth: &AuthorizationContext,
        object_name: &UniqueObjectName,
        request: &UploadRequest,
        stored: StoredObject,
    ) -> UploadedObject {
        UploadedObject {
            url: self.storage.public_url(auth, object_name),
            file_id: stored.file_id,
            file_name: object_name.to_string(),
            file_size: request.size(),
            upload_timestamp: stored.upload_timestamp,
        }
    }
}

fn log_attempts(object_name: &UniqueObjectName, records: &[AttemptRecord]) {
    for record in records {
        info!(
            object_name = %object_name,
            attempt = record.attempt,
            delay_ms = record.delay_before.as_millis() as u64,
            outcome = ?record.outcome,
            error = record.error.as_deref().unwrap_or("-"),
            "Upload attempt summary"
        );
    }
}
