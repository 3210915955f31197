use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    application::services::{
        retry::{retry_step, with_cancel, BackoffPolicy},
        ObjectStorage,
    },
    domain::{
        config::secrets::StorageSecrets,
        models::upload::{
            AuthorizationContext, StoredObject, UniqueObjectName, UploadRequest, UploadTarget,
        },
    },
    services::error::StorageError,
};

const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Characters left as-is in `X-Bz-File-Name`; everything else is percent-encoded.
const FILE_NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    authorization_token: String,
    api_url: String,
    download_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlRequest<'a> {
    bucket_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlResponse {
    bucket_id: String,
    upload_url: String,
    authorization_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadFileResponse {
    file_id: String,
    file_name: String,
    content_length: u64,
    upload_timestamp: i64,
}

pub struct B2StorageService {
    client: Client,
    secrets: StorageSecrets,
    step_policy: BackoffPolicy,
}

impl B2StorageService {
    pub fn new(client: Client, secrets: StorageSecrets) -> Self {
        Self::with_policy(client, secrets, BackoffPolicy::step())
    }

    pub fn with_policy(client: Client, secrets: StorageSecrets, step_policy: BackoffPolicy) -> Self {
        Self {
            client,
            secrets,
            step_policy,
        }
    }

    async fn authorize_once(&self) -> Result<AuthorizationContext, StorageError> {
        let response = self
            .client
            .get(&self.secrets.authorize_url)
            .basic_auth(&self.secrets.key_id, Some(&self.secrets.application_key))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| StorageError::from_reqwest(e, CONTROL_TIMEOUT))?;

        let body: AuthorizeAccountResponse = read_json(response, CONTROL_TIMEOUT).await?;

        Ok(AuthorizationContext {
            authorization_token: body.authorization_token,
            api_url: body.api_url.trim_end_matches('/').to_string(),
            download_url: body.download_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_upload_url_once(
        &self,
        auth: &AuthorizationContext,
    ) -> Result<UploadTarget, StorageError> {
        let url = format!("{}/b2api/v2/b2_get_upload_url", auth.api_url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, &auth.authorization_token)
            .json(&GetUploadUrlRequest {
                bucket_id: &self.secrets.bucket_id,
            })
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| StorageError::from_reqwest(e, CONTROL_TIMEOUT))?;

        let body: GetUploadUrlResponse = read_json(response, CONTROL_TIMEOUT).await?;

        Ok(UploadTarget {
            upload_url: body.upload_url,
            authorization_token: body.authorization_token,
            bucket_id: body.bucket_id,
        })
    }
}

#[async_trait]
impl ObjectStorage for B2StorageService {
    async fn authorize(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationContext, StorageError> {
        let auth = retry_step("authorize", &self.step_policy, cancel, || {
            self.authorize_once()
        })
        .await?;
        info!("Storage account authorized, api url {}", auth.api_url);
        Ok(auth)
    }

    async fn allocate_upload_target(
        &self,
        auth: &AuthorizationContext,
        cancel: &CancellationToken,
    ) -> Result<UploadTarget, StorageError> {
        retry_step("get_upload_url", &self.step_policy, cancel, || {
            self.get_upload_url_once(auth)
        })
        .await
    }

    async fn transfer(
        &self,
        request: &UploadRequest,
        target: UploadTarget,
        object_name: &UniqueObjectName,
        cancel: &CancellationToken,
    ) -> Result<StoredObject, StorageError> {
        let digest = content_sha1(request.content());
        let content_type = if request.content_type().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            request.content_type()
        };

        debug!(
            object_name = %object_name,
            bucket_id = %target.bucket_id,
            sha1 = %digest,
            "Transferring {} bytes",
            request.size()
        );

        let send = async {
            let response = self
                .client
                .post(&target.upload_url)
                .header(header::AUTHORIZATION, &target.authorization_token)
                .header("X-Bz-File-Name", encode_file_name(object_name.as_str()))
                .header(header::CONTENT_TYPE, content_type)
                .header("X-Bz-Content-Sha1", &digest)
                // Content-Length is derived from the body.
                .body(request.content().clone())
                .timeout(TRANSFER_TIMEOUT)
                .send()
                .await
                .map_err(|e| StorageError::from_reqwest(e, TRANSFER_TIMEOUT))?;

            read_json::<UploadFileResponse>(response, TRANSFER_TIMEOUT).await
        };

        let body = with_cancel(cancel, send).await?;

        Ok(StoredObject {
            file_id: body.file_id,
            file_name: body.file_name,
            content_length: body.content_length,
            upload_timestamp: body.upload_timestamp,
        })
    }

    fn public_url(&self, auth: &AuthorizationContext, object_name: &UniqueObjectName) -> String {
        format!(
            "{}/file/{}/{}",
            auth.download_url,
            self.secrets.bucket_name,
            encode_file_name(object_name.as_str())
        )
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StorageError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::from_reqwest(e, timeout))
}

/// Lowercase hex SHA-1 of the payload, sent for server-side integrity checks.
pub fn content_sha1(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

pub fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, FILE_NAME_ENCODE_SET).to_string()
}
