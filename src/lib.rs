//! # Fileshare
//!
//! Secure file sharing between two kinds of users: **ops** users upload
//! Office documents, **client** users sign up, verify their email address,
//! list the files and download them.
//!
//! ## Signed links
//!
//! Email verification and downloads both go through short-lived, tamper-evident
//! tokens (see [`token`]). A token is an HMAC-SHA256 signature over canonical
//! claims: purpose, subject user, optional resource and expiry. Tokens are not
//! stored server-side; a link stays valid until it expires, is bound to the user
//! it was issued for, and can only be redeemed for the purpose it was minted for.
//!
//! Every rejection (tampering, expiry, wrong purpose, wrong user, missing file)
//! reaches the client as the same generic error; the precise reason is only
//! logged.
//!
//! ## Layout
//!
//! - [`token`]: signer, per-purpose policy and access guard.
//! - [`flows`]: verification, upload and download flows on top of the token core.
//! - [`store`] and [`blob`]: persistence seams with in-memory and Postgres/filesystem backends.
//! - [`fileshare`]: the axum HTTP surface.
//! - [`cli`]: argument parsing, telemetry and startup actions.

pub mod blob;
pub mod cli;
pub mod credentials;
pub mod email;
pub mod fileshare;
pub mod flows;
pub mod model;
pub mod store;
pub mod token;
pub mod vault;

pub use fileshare::{APP_USER_AGENT, GIT_COMMIT_HASH};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
