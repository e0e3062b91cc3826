//! Email verification: `PendingVerification -> Verified`.
//!
//! Redeeming a still-valid token for an already-verified user is a no-op that
//! reports [`VerificationOutcome::AlreadyVerified`], not an error.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{link_url, FlowError, Tokens};
use crate::email::{EmailMessage, EmailSender};
use crate::model::User;
use crate::store::UserDirectory;
use crate::token::{Denied, Purpose};

const VERIFY_PATH: &str = "v1/auth/verify-email";
const VERIFY_SUBJECT: &str = "Verify your email";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

pub struct VerificationFlow {
    tokens: Tokens,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn EmailSender>,
    public_base_url: String,
}

impl VerificationFlow {
    #[must_use]
    pub fn new(
        tokens: Tokens,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn EmailSender>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            users,
            mailer,
            public_base_url: public_base_url.into(),
        }
    }

    /// Issue a verification token for `user` and mail the link.
    ///
    /// Mail delivery failures are logged and otherwise ignored; the returned
    /// URL is still valid.
    ///
    /// # Errors
    /// Only if the token cannot be issued.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn start(&self, user: &User) -> Result<String, FlowError> {
        let token = self.tokens.issue(Purpose::EmailVerify, user.id, None)?;
        let verify_url = link_url(&self.public_base_url, VERIFY_PATH, &token);

        let message = EmailMessage {
            to_email: user.email.clone(),
            subject: VERIFY_SUBJECT.to_string(),
            body: format!("Click the link to verify your email: {verify_url}"),
        };
        if let Err(err) = self.mailer.send(&message) {
            warn!("Failed to send verification email: {err}");
        }
        Ok(verify_url)
    }

    /// Verify the token and mark its subject verified.
    ///
    /// # Errors
    /// `Token` for any token failure, `Denied` when the subject no longer
    /// exists or is not a client, `Store` on storage failure.
    #[instrument(skip_all)]
    pub async fn redeem(&self, token: &str) -> Result<VerificationOutcome, FlowError> {
        let claims = self.tokens.verify(token, Purpose::EmailVerify)?;
        let user = self
            .users
            .find_user(claims.subject)
            .await?
            .ok_or(Denied::IdentityMismatch)?;
        self.tokens.guard().authorize(&claims, &user, None)?;

        if self.users.mark_email_verified(user.id).await? {
            info!(user_id = %user.id, "email verified");
            Ok(VerificationOutcome::Verified)
        } else {
            Ok(VerificationOutcome::AlreadyVerified)
        }
    }
}
