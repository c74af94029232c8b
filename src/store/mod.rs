//! Shared cooldown state for credentials.
//!
//! A credential observed to be quota-exhausted is excluded from selection
//! for a fixed TTL. This store is the only state shared across router
//! instances; records expire on their own and nothing deletes them early.
//! Eventual consistency is enough here: a credential picked just before
//! another process marks it cooling costs at most one extra provider error,
//! which classification and retry already absorb.

pub mod memory;
pub mod redis;

pub use memory::MemoryCooldownStore;
pub use self::redis::RedisCooldownStore;

use crate::error::StoreError;
use crate::pool::Credential;
use async_trait::async_trait;
use std::time::Duration;

/// Key under which a cooldown record lives. The purpose namespace keeps two
/// workloads sharing one pool from cross-excluding each other's credentials.
pub(crate) fn cooldown_key(purpose: &str, credential: &Credential) -> String {
    format!("cooldown:{}:{}", purpose, credential.secret())
}

/// Boolean-with-expiry state per (purpose, credential).
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Whether the credential is currently excluded for this purpose.
    async fn is_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
    ) -> Result<bool, StoreError>;

    /// Exclude the credential for `ttl`. Idempotent: re-marking within the
    /// TTL refreshes the expiry and never errors on its own account.
    async fn mark_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
        ttl: Duration,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_key_is_purpose_scoped() {
        let cred = Credential::new("k1");
        assert_eq!(cooldown_key("text", &cred), "cooldown:text:k1");
        assert_ne!(cooldown_key("text", &cred), cooldown_key("image", &cred));
    }
}
