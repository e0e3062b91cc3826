//! Use-case orchestration over the token core and the external collaborators.
//!
//! Each flow performs at most one side effect per call (mark a user verified,
//! store an upload, read a blob) and only after the token and guard checks
//! have passed.

mod download;
mod error;
mod upload;
mod verification;

pub use download::{Download, DownloadFlow, DownloadLink};
pub use error::FlowError;
pub use upload::{allowed_extension, content_type_for, UploadFlow, ALLOWED_EXTENSIONS};
pub use verification::{VerificationFlow, VerificationOutcome};

use std::sync::Arc;
use tracing::debug;

use crate::model::{FileId, UserId};
use crate::token::{AccessGuard, Claims, Purpose, Signer, TokenError, TokenPolicy};

/// Signer, policy and guard bundled for the flows. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Tokens {
    signer: Arc<Signer>,
    policy: TokenPolicy,
    guard: AccessGuard,
}

impl Tokens {
    #[must_use]
    pub fn new(signer: Arc<Signer>, policy: TokenPolicy) -> Self {
        Self {
            signer,
            policy,
            guard: AccessGuard::new(policy),
        }
    }

    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    #[must_use]
    pub const fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    fn issue(
        &self,
        purpose: Purpose,
        subject: UserId,
        resource: Option<&FileId>,
    ) -> Result<String, TokenError> {
        self.policy.issue(&self.signer, purpose, subject, resource)
    }

    fn verify(&self, token: &str, purpose: Purpose) -> Result<Claims, TokenError> {
        self.policy
            .verify(&self.signer, token, purpose)
            .inspect_err(|reason| debug!(purpose = purpose.as_str(), %reason, "token rejected"))
    }
}

/// `{base}/{path}/{token}` with exactly one slash at each join.
fn link_url(public_base_url: &str, path: &str, token: &str) -> String {
    format!(
        "{}/{}/{token}",
        public_base_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

#[cfg(test)]
pub(crate) fn test_tokens(policy: TokenPolicy) -> (Tokens, Arc<crate::token::ManualClock>) {
    use crate::token::{ManualClock, SigningKey};

    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let key = SigningKey::from_bytes(b"flows-test-secret-0123456789abcdef".to_vec());
    let signer = key
        .and_then(|key| Signer::new(&key, clock.clone()))
        .unwrap_or_else(|err| panic!("test signer: {err}"));
    (Tokens::new(Arc::new(signer), policy), clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_url_joins_cleanly() {
        assert_eq!(
            link_url("https://files.example.com/", "/v1/download/", "abc"),
            "https://files.example.com/v1/download/abc"
        );
        assert_eq!(
            link_url("http://localhost:8080", "v1/auth/verify-email", "t"),
            "http://localhost:8080/v1/auth/verify-email/t"
        );
    }
}
