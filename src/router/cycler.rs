//! Round-robin selection over the eligible subset of the pool.

use crate::error::StoreError;
use crate::pool::{Credential, CredentialPool};
use crate::store::CooldownStore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of a selection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The next eligible credential in round-robin order.
    Credential(Credential),

    /// Every credential in the pool is currently cooling.
    Exhausted,
}

/// Fair round-robin cycler over a credential pool.
///
/// The cursor advances monotonically across calls and is *not* reset when
/// credentials enter or leave cooldown, so a freshly shrunk active subset
/// does not pin selection to its first entry. Eligibility is recomputed from
/// the store on every call; nothing is cached.
#[derive(Debug, Default)]
pub struct CredentialCycler {
    cursor: AtomicUsize,
}

impl CredentialCycler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next eligible credential, or signal pool exhaustion.
    pub async fn next_eligible(
        &self,
        pool: &CredentialPool,
        store: &dyn CooldownStore,
        purpose: &str,
    ) -> Result<Selection, StoreError> {
        let mut active = Vec::new();
        for credential in pool.snapshot() {
            if !store.is_cooling(purpose, &credential).await? {
                active.push(credential);
            }
        }

        if active.is_empty() {
            return Ok(Selection::Exhausted);
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % active.len();
        Ok(Selection::Credential(active.swap_remove(index)))
    }
}
