//! Signed-token core: signer, per-purpose policy, access guard.
//!
//! Control flow: a flow asks the [`TokenPolicy`] to issue a token through the
//! [`Signer`], hands the opaque string to the caller inside a URL, and later
//! verifies it (integrity, expiry, purpose) before the [`AccessGuard`] checks
//! that the requesting user may redeem it.
//!
//! Tokens are never stored. Verification needs only the shared secret, so
//! there is no revocation short of expiry or secret rotation.

mod claims;
mod clock;
mod error;
mod guard;
mod policy;
mod replay;
mod signer;

pub use claims::{Claims, Purpose};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Denied, TokenError};
pub use guard::AccessGuard;
pub use policy::{
    PurposeRule, TokenPolicy, DEFAULT_DOWNLOAD_TTL_SECONDS, DEFAULT_EMAIL_VERIFY_TTL_SECONDS,
};
pub use replay::{MemoryLedger, RedemptionLedger};
pub use signer::{Signer, SigningKey, MIN_SECRET_LEN};
