//! Signed download redemption.

use axum::{
    extract::{Extension, Path},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::principal::require_role;
use super::types::ErrorResponse;
use super::utils::{content_disposition, error_response};
use crate::fileshare::state::AppState;
use crate::model::Role;

const DOWNLOAD_REJECTED: &str = "Invalid or expired download link.";

/// Redeem a download token and stream the file as an attachment.
///
/// Every token or access failure returns the same 400 body.
#[utoipa::path(
    get,
    path = "/v1/download/{token}",
    params(
        ("token" = String, Path, description = "Signed download token")
    ),
    responses(
        (status = 200, description = "File contents", body = String, content_type = "application/octet-stream"),
        (status = 400, description = "Invalid or expired link", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only client users can download files", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "files"
)]
pub async fn download(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let user = match require_role(
        &headers,
        &state,
        Role::Client,
        "Only client users can download files.",
    )
    .await
    {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.downloads().fetch(&token, &user).await {
        Ok(download) => {
            let mut response_headers = HeaderMap::new();
            response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(download.content_type));
            response_headers.insert(CONTENT_DISPOSITION, content_disposition(&download.filename));
            (StatusCode::OK, response_headers, download.bytes).into_response()
        }
        Err(err) if err.is_rejection() => error_response(StatusCode::BAD_REQUEST, DOWNLOAD_REJECTED),
        Err(err) => {
            error!("Failed to serve download: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.public_message())
        }
    }
}
