use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::models::upload::{
        AuthorizationContext, StoredObject, UniqueObjectName, UploadRequest, UploadTarget,
    },
    services::StorageError,
};

/// The three provider steps of an upload. Implementations own their per-step
/// retries for `authorize` and `allocate_upload_target`; `transfer` is a single
/// attempt.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn authorize(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationContext, StorageError>;

    async fn allocate_upload_target(
        &self,
        auth: &AuthorizationContext,
        cancel: &CancellationToken,
    ) -> Result<UploadTarget, StorageError>;

    async fn transfer(
        &self,
        request: &UploadRequest,
        target: UploadTarget,
        object_name: &UniqueObjectName,
        cancel: &CancellationToken,
    ) -> Result<StoredObject, StorageError>;

    fn public_url(&self, auth: &AuthorizationContext, object_name: &UniqueObjectName) -> String;
}
