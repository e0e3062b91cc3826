//! Access decisions for verified claims. Pure functions over resolved records.

use super::claims::{Claims, Purpose};
use super::error::Denied;
use super::policy::TokenPolicy;
use crate::model::{FileRecord, Role, User};

#[derive(Clone, Copy, Debug)]
pub struct AccessGuard {
    policy: TokenPolicy,
}

impl AccessGuard {
    #[must_use]
    pub const fn new(policy: TokenPolicy) -> Self {
        Self { policy }
    }

    /// Decide whether `requester` may redeem `claims`.
    ///
    /// Rules run in order and the first failure wins: identity, role, then
    /// (for downloads) the referenced file must exist and match the claim.
    ///
    /// # Errors
    /// Returns the first [`Denied`] rule that fails.
    pub fn authorize(
        &self,
        claims: &Claims,
        requester: &User,
        resource: Option<&FileRecord>,
    ) -> Result<(), Denied> {
        if requester.id != claims.subject {
            return Err(Denied::IdentityMismatch);
        }
        self.require_role(claims.purpose, requester.role)?;
        if claims.purpose == Purpose::FileDownload {
            match (resource, claims.resource.as_ref()) {
                (Some(record), Some(claimed)) if record.id == *claimed => {}
                _ => return Err(Denied::ResourceNotFound),
            }
        }
        Ok(())
    }

    /// Eager check before a download link is issued.
    ///
    /// # Errors
    /// `RoleMismatch` for non-client requesters, `ResourceNotFound` when the
    /// file does not exist.
    pub fn authorize_link_request(
        &self,
        requester: &User,
        file: Option<&FileRecord>,
    ) -> Result<(), Denied> {
        self.require_role(Purpose::FileDownload, requester.role)?;
        if file.is_none() {
            return Err(Denied::ResourceNotFound);
        }
        Ok(())
    }

    fn require_role(&self, purpose: Purpose, role: Role) -> Result<(), Denied> {
        if self.policy.rule(purpose).redeemer == role {
            Ok(())
        } else {
            Err(Denied::RoleMismatch)
        }
    }
}
