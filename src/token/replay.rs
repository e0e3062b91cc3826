//! Redemption ledger for single-use tokens.
//!
//! Tokens themselves stay stateless; when a purpose is configured as
//! single-use the flow records a SHA-256 digest of each redeemed token until
//! that token would have expired anyway.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

pub trait RedemptionLedger: Send + Sync {
    /// Record a redemption. Returns `false` if the token was already redeemed.
    fn first_use(&self, token: &str, expires_at: i64, now: i64) -> bool;
}

/// Process-local ledger. Entries are pruned once their token has expired.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    seen: Mutex<HashMap<[u8; 32], i64>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().map_or(0, |seen| seen.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RedemptionLedger for MemoryLedger {
    fn first_use(&self, token: &str, expires_at: i64, now: i64) -> bool {
        let digest: [u8; 32] = Sha256::digest(token.as_bytes()).into();
        // A poisoned lock only means another redemption panicked mid-insert;
        // the map itself is still consistent.
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.retain(|_, expiry| *expiry > now);
        if seen.contains_key(&digest) {
            return false;
        }
        seen.insert(digest, expires_at);
        true
    }
}
