use serde::Serialize;

use crate::domain::models::upload::UploadedObject;

#[derive(Debug, Serialize)]
pub struct UploadFileResponse {
    pub success: bool,
    pub url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "uploadTimestamp")]
    pub upload_timestamp: i64,
}

impl From<UploadedObject> for UploadFileResponse {
    fn from(uploaded: UploadedObject) -> Self {
        Self {
            success: true,
            url: uploaded.url,
            file_name: uploaded.file_name,
            file_size: uploaded.file_size,
            file_id: uploaded.file_id,
            upload_timestamp: uploaded.upload_timestamp,
        }
    }
}
