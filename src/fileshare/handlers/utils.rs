//! Small helpers shared by the handlers.

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::types::{ErrorResponse, MessageResponse};

const MAX_USERNAME_LEN: usize = 150;

pub(super) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn message_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Letters, digits and `@.+-_`, like most account systems accept.
pub(super) fn valid_username(username: &str) -> bool {
    username.len() <= MAX_USERNAME_LEN
        && Regex::new(r"^[A-Za-z0-9@.+_-]+$").is_ok_and(|regex| regex.is_match(username))
}

/// Create a new session token for the `Authorization` header.
/// The raw value is only returned to the caller; the store keeps a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never reach storage.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// `attachment; filename="..."` with anything outside printable ASCII replaced.
/// Names that needed replacing also get an RFC 5987 `filename*` with the
/// original UTF-8 name.
pub(super) fn content_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = if safe == filename {
        format!("attachment; filename=\"{safe}\"")
    } else {
        format!(
            "attachment; filename=\"{safe}\"; filename*=UTF-8''{}",
            encode_rfc5987(filename)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn encode_rfc5987(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push('%');
            encoded.push_str(&hex::encode_upper([byte]));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(valid_email("alice@example.com"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("alice example.com"));
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn username_validation() {
        assert!(valid_username("alice_01"));
        assert!(valid_username("a.b+c@d-e"));
        assert!(!valid_username(""));
        assert!(!valid_username("has space"));
        assert!(!valid_username(&"x".repeat(151)));
    }

    #[test]
    fn session_tokens_are_random_and_hashed() -> Result<()> {
        let first = generate_session_token()?;
        let second = generate_session_token()?;
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert_eq!(hash_session_token(&first).len(), 32);
        assert_eq!(hash_session_token(&first), hash_session_token(&first));
        Ok(())
    }

    #[test]
    fn content_disposition_is_sanitized() {
        assert_eq!(
            content_disposition("Q3 plan.docx"),
            "attachment; filename=\"Q3 plan.docx\""
        );
        assert_eq!(
            content_disposition("ré\"sumé\r\n.docx"),
            "attachment; filename=\"r__sum___.docx\"; \
             filename*=UTF-8''r%C3%A9%22sum%C3%A9%0D%0A.docx"
        );
        assert_eq!(
            content_disposition("résumé.docx"),
            "attachment; filename=\"r_sum_.docx\"; filename*=UTF-8''r%C3%A9sum%C3%A9.docx"
        );
    }
}
