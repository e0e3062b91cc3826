use thiserror::Error;

/// Reasons a presented token is rejected before any claim is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token issued for a different purpose")]
    WrongPurpose,
    #[error("resource claim does not match token purpose")]
    ResourceMismatch,
    #[error("single-use token already redeemed")]
    AlreadyRedeemed,
}

/// Reasons a verified token may not be redeemed by the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denied {
    #[error("requesting user does not match token subject")]
    IdentityMismatch,
    #[error("requesting user role is not allowed for this purpose")]
    RoleMismatch,
    #[error("referenced resource not found")]
    ResourceNotFound,
}
