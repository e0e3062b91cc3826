//! Ops uploads: Office documents only, stored under a generated file id.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::FlowError;
use crate::blob::BlobStore;
use crate::model::{FileId, FileRecord, Role, User};
use crate::store::FileCatalog;
use crate::token::{Clock, Denied};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pptx", "docx", "xlsx"];

const MAX_FILENAME_LEN: usize = 255;

/// Lowercased extension if it is one of [`ALLOWED_EXTENSIONS`].
#[must_use]
pub fn allowed_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| allowed.eq_ignore_ascii_case(ext))
}

#[must_use]
pub fn content_type_for(filename: &str) -> &'static str {
    match allowed_extension(filename) {
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Strip any client-side directory components.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

pub struct UploadFlow {
    files: Arc<dyn FileCatalog>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    max_upload_bytes: usize,
}

impl UploadFlow {
    #[must_use]
    pub fn new(
        files: Arc<dyn FileCatalog>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            files,
            blobs,
            clock,
            max_upload_bytes,
        }
    }

    #[must_use]
    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate and persist an upload.
    ///
    /// # Errors
    /// `Denied(RoleMismatch)` for non-ops uploaders, `InvalidUpload` for a bad
    /// name, type or size, `Store`/`Internal` on persistence failures.
    #[instrument(skip(self, uploader, bytes), fields(user_id = %uploader.id, size = bytes.len()))]
    pub async fn store(
        &self,
        uploader: &User,
        filename: &str,
        bytes: &[u8],
    ) -> Result<FileRecord, FlowError> {
        if uploader.role != Role::Ops {
            return Err(Denied::RoleMismatch.into());
        }
        let filename = base_name(filename);
        if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
            return Err(FlowError::InvalidUpload("Invalid file name."));
        }
        let ext = allowed_extension(filename).ok_or(FlowError::InvalidUpload(
            "Only .pptx, .docx and .xlsx files are allowed.",
        ))?;
        if bytes.is_empty() {
            return Err(FlowError::InvalidUpload("File is empty."));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(FlowError::InvalidUpload("File is too large."));
        }

        let id = FileId::generate();
        let blob_key = format!("{id}.{ext}");
        self.blobs.put(&blob_key, bytes).await?;

        let record = FileRecord {
            id,
            uploader: uploader.id,
            original_filename: filename.to_string(),
            blob_key,
            size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            uploaded_at: self.clock.now(),
        };
        if let Err(err) = self.files.insert_file(record.clone()).await {
            if let Err(cleanup) = self.blobs.delete(&record.blob_key).await {
                warn!(blob_key = %record.blob_key, "failed to remove orphaned blob: {cleanup}");
            }
            return Err(err.into());
        }
        info!(file_id = %record.id, "file uploaded");
        Ok(record)
    }
}
