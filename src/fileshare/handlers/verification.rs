//! Email verification link endpoint.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::types::{ErrorResponse, MessageResponse};
use super::utils::{error_response, message_response};
use crate::fileshare::state::AppState;

const VERIFY_REJECTED: &str = "Invalid or expired verification link.";

/// Redeem an email verification token. Repeated redemption is a no-op success.
#[utoipa::path(
    get,
    path = "/v1/auth/verify-email/{token}",
    params(
        ("token" = String, Path, description = "Signed verification token")
    ),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired link", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    state: Extension<Arc<AppState>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match state.verification().redeem(&token).await {
        Ok(_) => message_response(StatusCode::OK, "Email verified successfully."),
        Err(err) if err.is_rejection() => error_response(StatusCode::BAD_REQUEST, VERIFY_REJECTED),
        Err(err) => {
            error!("Failed to verify email: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.public_message())
        }
    }
}
