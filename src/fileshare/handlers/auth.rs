//! Client signup and password login.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info};

use super::types::{ErrorResponse, LoginRequest, LoginResponse, MessageResponse, SignupRequest};
use super::utils::{
    error_response, generate_session_token, hash_session_token, message_response,
    normalize_email, valid_email, valid_username,
};
use crate::credentials::{hash_password, verify_password, verify_unknown_account, MIN_PASSWORD_LEN};
use crate::fileshare::state::AppState;
use crate::model::Role;
use crate::store::{NewUser, StoreError};

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Register a client account and mail a verification link.
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = MessageResponse),
        (status = 400, description = "Invalid username, email or password", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let username = request.username.trim().to_string();
    if !valid_username(&username) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid username.");
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email.");
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters.",
        );
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed.");
        }
    };

    // Signup only ever creates clients; ops accounts come from the CLI.
    let new_user = NewUser {
        username,
        email,
        password_hash,
        role: Role::Client,
        email_verified: false,
    };
    let user = match state.users().create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(field)) => {
            return error_response(StatusCode::CONFLICT, &format!("That {field} is already taken."));
        }
        Err(err) => {
            error!("Failed to create user: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed.");
        }
    };
    info!(user_id = %user.id, "client signed up");

    if let Err(err) = state.verification().start(&user) {
        error!("Failed to start email verification: {err}");
    }

    message_response(
        StatusCode::CREATED,
        "Check your email for verification link.",
    )
}

/// Exchange username and password for a bearer session token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let stored = match state.users().find_credentials(request.username.trim()).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            verify_unknown_account(&request.password);
            return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
        }
        Err(err) => {
            error!("Failed to lookup credentials: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed.");
        }
    };
    if !verify_password(&request.password, &stored.password_hash) {
        return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
    }
    let user = stored.user;
    if user.role == Role::Client && !user.email_verified {
        return error_response(StatusCode::FORBIDDEN, "Email not verified.");
    }

    let token = match generate_session_token() {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to generate session token: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed.");
        }
    };
    let now = state.now();
    let expires_at = now.saturating_add(state.config().session_ttl_seconds());
    if let Err(err) = state
        .sessions()
        .create_session(hash_session_token(&token), user.id, expires_at, now)
        .await
    {
        error!("Failed to create session: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed.");
    }
    info!(user_id = %user.id, role = %user.role, "user logged in");

    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            role: user.role,
        }),
    )
        .into_response()
}
