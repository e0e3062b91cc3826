//! File upload (ops), listing and download-link issuance (clients).

use axum::{
    extract::{Extension, Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

use super::principal::require_role;
use super::types::{DownloadLinkResponse, ErrorResponse, FileResponse, UploadForm};
use super::utils::error_response;
use crate::fileshare::state::AppState;
use crate::flows::FlowError;
use crate::model::{FileId, Role};

const UPLOAD_FIELD: &str = "file";

fn flow_error_response(err: &FlowError) -> Response {
    match err {
        FlowError::Token(_) | FlowError::Denied(_) => {
            error_response(StatusCode::FORBIDDEN, "Access denied.")
        }
        FlowError::FileNotFound => error_response(StatusCode::NOT_FOUND, err.public_message()),
        FlowError::InvalidUpload(_) => error_response(StatusCode::BAD_REQUEST, err.public_message()),
        FlowError::Store(_) | FlowError::Internal(_) => {
            error!("File request failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.public_message())
        }
    }
}

/// Upload a `.pptx`, `.docx` or `.xlsx` file.
#[utoipa::path(
    post,
    path = "/v1/files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Missing file or disallowed type", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only ops users can upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "files"
)]
pub async fn upload_file(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let user = match require_role(
        &headers,
        &state,
        Role::Ops,
        "Only Ops users can upload files.",
    )
    .await
    {
        Ok(user) => user,
        Err(response) => return response,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                debug!("Invalid multipart body: {err}");
                return error_response(err.status(), "Invalid upload.");
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("Failed to read upload: {err}");
                let status = err.status();
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "File is too large."
                } else {
                    "Invalid upload."
                };
                return error_response(status, message);
            }
        };

        return match state.uploads().store(&user, &filename, &bytes).await {
            Ok(record) => (StatusCode::CREATED, Json(FileResponse::from(record))).into_response(),
            Err(err) => flow_error_response(&err),
        };
    }

    error_response(StatusCode::BAD_REQUEST, "No file provided.")
}

/// List uploaded files, newest first.
#[utoipa::path(
    get,
    path = "/v1/files",
    responses(
        (status = 200, description = "Uploaded files", body = [FileResponse]),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only client users can list files", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "files"
)]
pub async fn list_files(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    if let Err(response) = require_role(
        &headers,
        &state,
        Role::Client,
        "Only client users can list files.",
    )
    .await
    {
        return response;
    }

    match state.files().list_files().await {
        Ok(records) => {
            let files: Vec<FileResponse> = records.into_iter().map(FileResponse::from).collect();
            (StatusCode::OK, Json(files)).into_response()
        }
        Err(err) => {
            error!("Failed to list files: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
        }
    }
}

/// Issue a short-lived signed download link for one file.
#[utoipa::path(
    get,
    path = "/v1/files/{file_id}/download-link",
    params(
        ("file_id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "Signed link issued", body = DownloadLinkResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only client users can get download links", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "files"
)]
pub async fn download_link(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    let user = match require_role(
        &headers,
        &state,
        Role::Client,
        "Only client users can get download links.",
    )
    .await
    {
        Ok(user) => user,
        Err(response) => return response,
    };

    let Some(file_id) = FileId::parse(&file_id) else {
        return error_response(StatusCode::NOT_FOUND, "File not found.");
    };

    match state.downloads().request_link(&file_id, &user).await {
        Ok(link) => (
            StatusCode::OK,
            Json(DownloadLinkResponse {
                download_url: link.download_url,
                message: "success".to_string(),
                expires_in: link.expires_in,
            }),
        )
            .into_response(),
        Err(err) => flow_error_response(&err),
    }
}
