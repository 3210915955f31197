use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    adapters::{dto::upload_dto::UploadFileResponse, state::AppState},
    application::error::ApplicationError,
    domain::models::upload::UploadRequest,
};

pub struct UploadController;

impl UploadController {
    /// Uploads a certification file to object storage
    /// POST /api/v1/uploads (multipart, field "file")
    pub async fn upload_certification(
        State(app_state): State<AppState>,
        mut multipart: Multipart,
    ) -> Result<Json<UploadFileResponse>, ApplicationError> {
        let mut file: Option<(Bytes, String, String)> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!("Invalid multipart data: {}", e);
            ApplicationError::BadRequest("Invalid multipart request".to_string())
        })? {
            if field.name() != Some("file") {
                continue;
            }

            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Cannot read file bytes: {}", e);
                ApplicationError::BadRequest("Invalid file data".to_string())
            })?;

            file = Some((bytes, content_type, file_name));
        }

        let (bytes, content_type, file_name) = file.ok_or_else(|| {
            ApplicationError::BadRequest("No file was provided".to_string())
        })?;

        let request = UploadRequest::new(bytes, content_type, file_name)
            .map_err(|e| ApplicationError::BadRequest(e.to_string()))?;

        let pipeline = app_state.uploads.pipeline()?;

        // Dropping the handler future (client gone) or shutting down cancels the run.
        let cancel = app_state.shutdown.child_token();
        let _guard = cancel.clone().drop_guard();

        info!(
            "Received certification upload '{}' ({} bytes, {})",
            request.file_name(),
            request.size(),
            request.content_type()
        );

        let uploaded = pipeline.run(&request, &cancel).await?;

        Ok(Json(UploadFileResponse::from(uploaded)))
    }
}
