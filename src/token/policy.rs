//! Per-purpose token rules: lifetime, resource shape, redeemer role, reuse.

use super::claims::{Claims, Purpose};
use super::error::TokenError;
use super::signer::Signer;
use crate::model::{FileId, Role, UserId};

pub const DEFAULT_EMAIL_VERIFY_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_DOWNLOAD_TTL_SECONDS: i64 = 10 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurposeRule {
    pub ttl_seconds: i64,
    pub requires_resource: bool,
    pub redeemer: Role,
    pub single_use: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct TokenPolicy {
    email_verify: PurposeRule,
    file_download: PurposeRule,
}

impl TokenPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            email_verify: PurposeRule {
                ttl_seconds: DEFAULT_EMAIL_VERIFY_TTL_SECONDS,
                requires_resource: false,
                redeemer: Role::Client,
                single_use: false,
            },
            file_download: PurposeRule {
                ttl_seconds: DEFAULT_DOWNLOAD_TTL_SECONDS,
                requires_resource: true,
                redeemer: Role::Client,
                single_use: false,
            },
        }
    }

    #[must_use]
    pub fn with_email_verify_ttl_seconds(mut self, seconds: i64) -> Self {
        self.email_verify.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_download_ttl_seconds(mut self, seconds: i64) -> Self {
        self.file_download.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_single_use_downloads(mut self, single_use: bool) -> Self {
        self.file_download.single_use = single_use;
        self
    }

    #[must_use]
    pub const fn rule(&self, purpose: Purpose) -> &PurposeRule {
        match purpose {
            Purpose::EmailVerify => &self.email_verify,
            Purpose::FileDownload => &self.file_download,
        }
    }

    /// Issue a token with the purpose's lifetime after checking the resource shape.
    ///
    /// # Errors
    /// `ResourceMismatch` when a resource is missing for a purpose that needs
    /// one, or present for a purpose that forbids it.
    pub fn issue(
        &self,
        signer: &Signer,
        purpose: Purpose,
        subject: UserId,
        resource: Option<&FileId>,
    ) -> Result<String, TokenError> {
        let rule = self.rule(purpose);
        if rule.requires_resource != resource.is_some() {
            return Err(TokenError::ResourceMismatch);
        }
        Ok(signer.issue(purpose, subject, resource, rule.ttl_seconds))
    }

    /// Verify a token and require it to carry `expected` purpose.
    ///
    /// # Errors
    /// Any signer error, `WrongPurpose` for cross-purpose replay, and
    /// `ResourceMismatch` when the resource claim has the wrong shape.
    pub fn verify(
        &self,
        signer: &Signer,
        token: &str,
        expected: Purpose,
    ) -> Result<Claims, TokenError> {
        let claims = signer.verify(token)?;
        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose);
        }
        if self.rule(expected).requires_resource != claims.resource.is_some() {
            return Err(TokenError::ResourceMismatch);
        }
        Ok(claims)
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::new()
    }
}
