//! Argon2id password hashing for local accounts.

use anyhow::{anyhow, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password into a PHC string.
///
/// # Errors
/// Returns an error if Argon2 fails to hash.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored PHC string. An unparsable hash never matches.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Spend the same Argon2 work as [`verify_password`] for an account that does
/// not exist.
pub fn verify_unknown_account(password: &str) {
    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("unknown-account").ok()) {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("correct horse")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        Ok(())
    }

    #[test]
    fn salts_differ() -> Result<()> {
        assert_ne!(hash_password("same")?, hash_password("same")?);
        Ok(())
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn unknown_account_check_runs_argon2() {
        verify_unknown_account("correct horse");
        let hash = DUMMY_HASH.get().cloned().flatten();
        assert!(hash.is_some_and(|hash| hash.starts_with("$argon2id$")));
    }
}
