//! Authenticated user extraction and role gates.
//!
//! Flow Overview: read the bearer session token, hash it, resolve the hash to
//! a live session and load the user. Role gates run before any token work so
//! an ops user never reaches the download verifier.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Response,
};
use tracing::error;

use super::utils::{error_response, hash_session_token};
use crate::fileshare::state::AppState;
use crate::model::{Role, User};

const BEARER_PREFIX: &str = "Bearer ";

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer session into a user, or a ready 401/500 response.
pub(super) async fn require_auth(headers: &HeaderMap, state: &AppState) -> Result<User, Response> {
    let unauthorized = || error_response(StatusCode::UNAUTHORIZED, "Authentication required.");
    let Some(token) = extract_bearer_token(headers) else {
        return Err(unauthorized());
    };
    // Only the hash is stored; never compare raw tokens against storage.
    let token_hash = hash_session_token(token);
    let user_id = match state.sessions().session_user(&token_hash, state.now()).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Err(unauthorized()),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.",
            ));
        }
    };
    match state.users().find_user(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(unauthorized()),
        Err(err) => {
            error!("Failed to load session user: {err}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.",
            ))
        }
    }
}

/// Authenticate and require `role`; 403 with `message` otherwise.
pub(super) async fn require_role(
    headers: &HeaderMap,
    state: &AppState,
    role: Role,
    message: &str,
) -> Result<User, Response> {
    let user = require_auth(headers, state).await?;
    if user.role == role {
        Ok(user)
    } else {
        Err(error_response(StatusCode::FORBIDDEN, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
