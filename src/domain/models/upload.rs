use std::{fmt, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use thiserror::Error;

/// 10 MiB.
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

pub const OBJECT_NAME_PREFIX: &str = "certifications";

const RANDOM_SUFFIX_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidUpload {
    #[error("No file was provided")]
    EmptyFile,

    #[error("Invalid file type '{0}'. Allowed types: PDF, JPEG, PNG, WEBP, DOC, DOCX")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes). Maximum size is 10 MiB")]
    TooLarge { size: u64 },
}

/// A file submitted for upload. Only constructible through [`UploadRequest::new`],
/// which enforces the size limit and the MIME allow-list.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    content: Bytes,
    content_type: String,
    file_name: String,
}

impl UploadRequest {
    pub fn new(
        content: Bytes,
        content_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, InvalidUpload> {
        let content_type = content_type.into().trim().to_ascii_lowercase();

        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
            return Err(InvalidUpload::UnsupportedType(content_type));
        }

        let size = content.len() as u64;
        if size == 0 {
            return Err(InvalidUpload::EmptyFile);
        }
        if size > MAX_UPLOAD_SIZE {
            return Err(InvalidUpload::TooLarge { size });
        }

        Ok(Self {
            content,
            content_type,
            file_name: file_name.into(),
        })
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Storage key for one upload request, reused across every retry attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueObjectName(String);

impl UniqueObjectName {
    pub fn generate(original_name: &str) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .map(char::from)
            .collect::<String>()
            .to_ascii_lowercase();

        Self(format!(
            "{}/{}-{}-{}",
            OBJECT_NAME_PREFIX,
            timestamp,
            suffix,
            sanitize_file_name(original_name)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replaces every non-alphanumeric character of the stem with `_` and keeps the
/// extension as given (alphanumeric only).
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(original)
        .trim();

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let mut sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        sanitized.push_str("file");
    }

    if let Some(ext) = extension {
        let ext: String = ext.chars().filter(char::is_ascii_alphanumeric).collect();
        if !ext.is_empty() {
            sanitized.push('.');
            sanitized.push_str(&ext);
        }
    }

    sanitized
}

/// Account-level authorization returned by the credential authority.
#[derive(Clone)]
pub struct AuthorizationContext {
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
}

impl fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationContext")
            .field("authorization_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("download_url", &self.download_url)
            .finish()
    }
}

/// Single-use upload endpoint. Consumed by value by one transfer attempt.
#[derive(Clone)]
pub struct UploadTarget {
    pub upload_url: String,
    pub authorization_token: String,
    pub bucket_id: String,
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("upload_url", &self.upload_url)
            .field("authorization_token", &"<redacted>")
            .field("bucket_id", &self.bucket_id)
            .finish()
    }
}

/// Metadata the provider assigns to an accepted object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub file_id: String,
    pub file_name: String,
    pub content_length: u64,
    pub upload_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub url: String,
    pub file_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub upload_timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    RetryableFailure,
    FatalFailure,
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub delay_before: Duration,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
}
