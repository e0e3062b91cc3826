use thiserror::Error;

use crate::store::StoreError;
use crate::token::{Denied, TokenError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Denied(#[from] Denied),
    #[error("file not found")]
    FileNotFound,
    #[error("invalid upload: {0}")]
    InvalidUpload(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FlowError {
    /// Token and guard failures. Clients only ever see one generic message for these.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Token(_) | Self::Denied(_))
    }

    /// Message safe to return to a client. Never names the rejection reason.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Token(_) | Self::Denied(_) => "Invalid or expired link.",
            Self::FileNotFound => "File not found.",
            Self::InvalidUpload(reason) => reason,
            Self::Store(_) | Self::Internal(_) => "Internal server error.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_share_one_message() {
        let reasons = [
            FlowError::from(TokenError::MalformedToken),
            FlowError::from(TokenError::InvalidSignature),
            FlowError::from(TokenError::Expired),
            FlowError::from(TokenError::AlreadyRedeemed),
            FlowError::from(Denied::IdentityMismatch),
            FlowError::from(Denied::RoleMismatch),
            FlowError::from(Denied::ResourceNotFound),
        ];
        for reason in &reasons {
            assert!(reason.is_rejection());
            assert_eq!(reason.public_message(), "Invalid or expired link.");
        }
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = FlowError::from(anyhow::anyhow!("disk on fire at /var/lib/uploads"));
        assert!(!err.is_rejection());
        assert_eq!(err.public_message(), "Internal server error.");
        assert_eq!(
            FlowError::InvalidUpload("Only .pptx, .docx and .xlsx files are allowed.")
                .public_message(),
            "Only .pptx, .docx and .xlsx files are allowed."
        );
    }
}
