//! Redis-backed cooldown store shared across router instances.
//!
//! One `SET ... EX` per quota event and one `EXISTS` per eligibility check;
//! expiry is enforced by the server, so no cleanup pass is needed and no
//! lock is held around either round trip.

use crate::error::StoreError;
use crate::pool::Credential;
use crate::store::{cooldown_key, CooldownStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::time::Duration;

/// Cooldown store over a shared Redis instance.
#[derive(Clone)]
pub struct RedisCooldownStore {
    conn: ConnectionManager,
}

impl RedisCooldownStore {
    /// Connect to a `host:port` target or a full `redis://` URL. The
    /// connection manager reconnects on its own after transient failures.
    pub async fn connect(addr: &str) -> Result<Self, StoreError> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        };
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CooldownStore for RedisCooldownStore {
    async fn is_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(cooldown_key(purpose, credential)).await?;
        Ok(exists)
    }

    async fn mark_cooling(
        &self,
        purpose: &str,
        credential: &Credential,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(cooldown_key(purpose, credential), "1", ttl_secs)
            .await?;
        Ok(())
    }
}

impl fmt::Debug for RedisCooldownStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCooldownStore").finish_non_exhaustive()
    }
}
