//! HMAC-SHA256 signer for self-contained, expiring tokens.
//!
//! Wire format: `base64url_nopad(canonical || ":" || hex(mac))`. The signature
//! is a fixed 64 lowercase hex characters so it is split off by position.
//! Nothing is stored server-side; rotating the secret invalidates every
//! outstanding token.

use anyhow::{anyhow, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

use super::claims::{Claims, Purpose};
use super::clock::Clock;
use super::error::TokenError;
use crate::model::{FileId, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;
const SIGNATURE_HEX_LEN: usize = 64;
const MAX_TOKEN_LEN: usize = 2048;

/// Process-wide signing secret.
pub struct SigningKey(SecretBox<Vec<u8>>);

impl SigningKey {
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "signing secret is {} bytes, expected at least {MIN_SECRET_LEN}",
                bytes.len()
            ));
        }
        Ok(Self(SecretBox::new(Box::new(bytes))))
    }

    /// # Errors
    /// Returns an error if the secret is too short.
    pub fn from_secret_string(secret: &SecretString) -> Result<Self> {
        Self::from_bytes(secret.expose_secret().as_bytes().to_vec())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Issues and verifies tokens. Holds no mutable state; share it behind an `Arc`.
pub struct Signer {
    mac: HmacSha256,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// # Errors
    /// Returns an error if the key cannot initialize HMAC.
    pub fn new(key: &SigningKey, clock: Arc<dyn Clock>) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key.0.expose_secret())
            .map_err(|err| anyhow!("invalid signing key: {err}"))?;
        Ok(Self { mac, clock })
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a token for `purpose` bound to `subject` and optional `resource`.
    ///
    /// A non-positive `ttl_seconds` produces a token that never verifies.
    #[must_use]
    pub fn issue(
        &self,
        purpose: Purpose,
        subject: UserId,
        resource: Option<&FileId>,
        ttl_seconds: i64,
    ) -> String {
        let issued_at = self.clock.now();
        let claims = Claims {
            purpose,
            subject,
            resource: resource.cloned(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl_seconds),
        };
        self.encode(&claims)
    }

    /// Decode, authenticate and expiry-check a token.
    ///
    /// # Errors
    /// `MalformedToken` when the token cannot be decoded or parsed,
    /// `InvalidSignature` when the MAC does not match, `Expired` when
    /// the current time is at or past `expires_at`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() || token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::MalformedToken);
        }
        let raw = Base64UrlUnpadded::decode_vec(token).map_err(|_| TokenError::MalformedToken)?;

        let split = raw
            .len()
            .checked_sub(SIGNATURE_HEX_LEN + 1)
            .ok_or(TokenError::MalformedToken)?;
        let (body, trailer) = raw.split_at(split);
        let signature_hex = trailer
            .strip_prefix(b":")
            .ok_or(TokenError::MalformedToken)?;

        let canonical = std::str::from_utf8(body).map_err(|_| TokenError::MalformedToken)?;
        let claims = Claims::from_canonical(canonical).ok_or(TokenError::MalformedToken)?;

        let signature = decode_signature(signature_hex).ok_or(TokenError::InvalidSignature)?;
        let mut mac = self.mac.clone();
        mac.update(claims.canonical().as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        if claims.expires_at <= claims.issued_at || self.clock.now() >= claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> String {
        let canonical = claims.canonical();
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Base64UrlUnpadded::encode_string(format!("{canonical}:{signature}").as_bytes())
    }
}

/// Only lowercase hex is accepted so every bit flip changes the decoded value.
fn decode_signature(signature_hex: &[u8]) -> Option<Vec<u8>> {
    if !signature_hex
        .iter()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
    {
        return None;
    }
    hex::decode(signature_hex).ok()
}
