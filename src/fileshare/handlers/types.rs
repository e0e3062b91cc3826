//! Request/response bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{FileRecord, Role};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DownloadLinkResponse {
    pub download_url: String,
    pub message: String,
    /// Seconds until the link stops working.
    pub expires_in: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FileResponse {
    pub id: String,
    pub filename: String,
    pub size_bytes: i64,
    pub uploaded_at: i64,
    pub uploaded_by: i64,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            filename: record.original_filename,
            size_bytes: record.size_bytes,
            uploaded_at: record.uploaded_at,
            uploaded_by: record.uploader.0,
        }
    }
}

/// Multipart form for uploads; documentation only.
#[derive(ToSchema, Debug)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
