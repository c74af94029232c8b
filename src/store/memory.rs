//! In-process cooldown store for tests and single-instance deployments.

use crate::error::StoreError;
use crate::pool::Credential;
use crate::store::{cooldown_key, CooldownStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cooldown store backed by a process-local map of key to expiry instant.
///
/// Expired records are dropped lazily on read, mirroring the TTL semantics
/// of the shared backend.
#[derive(Debug, Default)]
pub struct MemoryCooldownStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn is_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
    ) -> Result<bool, StoreError> {
        let key = cooldown_key(purpose, credential);
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(expiry) if *expiry > Instant::now() => Ok(true),
            Some(_) => {
                entries.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn mark_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = cooldown_key(purpose, credential);
        self.entries.lock().insert(key, Instant::now() + ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_then_cooling() {
        let store = MemoryCooldownStore::new();
        let cred = Credential::new("k1");

        assert!(!store.is_cooling("text", &cred).await.unwrap());
        store
            .mark_cooling("text", &cred, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.is_cooling("text", &cred).await.unwrap());
    }

    #[tokio::test]
    async fn test_cooldown_expires() {
        let store = MemoryCooldownStore::new();
        let cred = Credential::new("k1");

        store
            .mark_cooling("text", &cred, Duration::from_millis(40))
            .await
            .unwrap();
        assert!(store.is_cooling("text", &cred).await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.is_cooling("text", &cred).await.unwrap());
    }

    #[tokio::test]
    async fn test_remark_is_idempotent_and_refreshes() {
        let store = MemoryCooldownStore::new();
        let cred = Credential::new("k1");

        store
            .mark_cooling("text", &cred, Duration::from_millis(30))
            .await
            .unwrap();
        store
            .mark_cooling("text", &cred, Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        // Still excluded: the second mark pushed the expiry out.
        assert!(store.is_cooling("text", &cred).await.unwrap());
    }

    #[tokio::test]
    async fn test_purposes_do_not_cross_exclude() {
        let store = MemoryCooldownStore::new();
        let cred = Credential::new("k1");

        store
            .mark_cooling("text", &cred, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.is_cooling("text", &cred).await.unwrap());
        assert!(!store.is_cooling("image", &cred).await.unwrap());
    }
}
