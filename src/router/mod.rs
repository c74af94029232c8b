//! Request router over a pool of quota-limited credentials.
//!
//! Makes the pool look like one always-available text-generation service:
//! calls go to a primary client bound to the current credential; a
//! classified quota error marks that credential cooling in the shared store,
//! rotates to the next eligible credential (or the fallback backend when
//! none is left), and re-issues the same logical call under a bounded,
//! jittered retry budget. Non-quota errors propagate on first occurrence.

pub mod cycler;

pub use cycler::{CredentialCycler, Selection};

use crate::api::{ChatMessage, GenerateOptions};
use crate::client::{ClientFactory, CompletionBackend, HttpClientFactory};
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::pool::{Credential, CredentialPool};
use crate::store::{CooldownStore, RedisCooldownStore};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for quota-driven rotation.
///
/// Backoff is randomized exponential so concurrently failing router
/// instances do not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for one logical call, first try included.
    pub max_attempts: u32,

    /// Base backoff interval.
    pub initial_interval: Duration,

    /// Backoff cap.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

/// Per-router behavior knobs.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Workload namespace for cooldown records.
    pub purpose: String,

    /// TTL applied to a credential on quota exhaustion.
    pub cooldown: Duration,

    pub retry: RetryPolicy,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            purpose: "default".to_string(),
            cooldown: Duration::from_secs(600),
            retry: RetryPolicy::default(),
        }
    }
}

/// The client the router is currently serving from.
enum Active {
    Primary {
        credential: Credential,
        client: Arc<dyn CompletionBackend>,
    },
    Fallback {
        client: Arc<dyn CompletionBackend>,
    },
}

/// Credential-rotation request router.
///
/// State here is private to one instance: the active client and the
/// round-robin cursor. The recommended deployment unit is one router per
/// purpose; instances coordinate only through the shared cooldown store.
pub struct Router {
    pool: CredentialPool,
    store: Arc<dyn CooldownStore>,
    factory: Arc<dyn ClientFactory>,
    cycler: CredentialCycler,
    purpose: String,
    cooldown: Duration,
    retry: RetryPolicy,
    active: Mutex<Active>,
}

enum Call<'a> {
    Complete(&'a str),
    Chat(&'a [ChatMessage]),
}

impl Router {
    /// Construct a router over explicit collaborators.
    ///
    /// Selection runs once up front, so a pool with nothing eligible and an
    /// unreachable fallback fails here with
    /// [`RouterError::BackendUnreachable`].
    pub async fn new(
        pool: CredentialPool,
        store: Arc<dyn CooldownStore>,
        factory: Arc<dyn ClientFactory>,
        options: RouterOptions,
    ) -> Result<Self> {
        let cycler = CredentialCycler::new();
        let initial = select_active(
            &pool,
            store.as_ref(),
            factory.as_ref(),
            &cycler,
            &options.purpose,
        )
        .await?;

        Ok(Self {
            pool,
            store,
            factory,
            cycler,
            purpose: options.purpose,
            cooldown: options.cooldown,
            retry: options.retry,
            active: Mutex::new(initial),
        })
    }

    /// Wire up the production collaborators from configuration:
    /// env-discovered pool, Redis cooldown store, Gemini primary, vLLM
    /// fallback.
    pub async fn from_config(config: RouterConfig) -> Result<Self> {
        let pool = CredentialPool::discover(&config.key_prefix)?;
        let store = RedisCooldownStore::connect(&config.redis_addr).await?;
        let factory = HttpClientFactory::new(
            config.request_timeout,
            config.gemini.clone(),
            config.fallback.clone(),
        )?;

        Self::new(
            pool,
            Arc::new(store),
            Arc::new(factory),
            RouterOptions {
                purpose: config.purpose,
                cooldown: Duration::from_secs(config.cooldown_seconds),
                retry: config.retry,
            },
        )
        .await
    }

    /// Single-turn text completion.
    pub async fn complete(&self, prompt: &str, opts: &GenerateOptions) -> Result<String> {
        self.execute(Call::Complete(prompt), opts).await
    }

    /// Multi-turn completion.
    pub async fn chat(&self, messages: &[ChatMessage], opts: &GenerateOptions) -> Result<String> {
        self.execute(Call::Chat(messages), opts).await
    }

    /// Whether the router is currently serving from the fallback backend.
    pub fn on_fallback(&self) -> bool {
        matches!(&*self.active.lock(), Active::Fallback { .. })
    }

    /// Credential currently bound to the primary client, if any.
    pub fn active_credential(&self) -> Option<Credential> {
        match &*self.active.lock() {
            Active::Primary { credential, .. } => Some(credential.clone()),
            Active::Fallback { .. } => None,
        }
    }

    async fn execute(&self, call: Call<'_>, opts: &GenerateOptions) -> Result<String> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.backoff();

        for attempt in 1..=max_attempts {
            let (client, bound) = self.current();
            let outcome = match call {
                Call::Complete(prompt) => client.complete(prompt, opts).await,
                Call::Chat(messages) => client.chat(messages, opts).await,
            };

            let err = match outcome {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            // Fallback errors are never retried: there is no credential to
            // rotate. Same for anything the client did not classify as a
            // quota signal.
            let Some(credential) = bound else {
                return Err(RouterError::Provider(err.to_string()));
            };
            if !err.is_quota() {
                return Err(RouterError::Provider(err.to_string()));
            }

            warn!(
                credential = credential.fingerprint(),
                purpose = %self.purpose,
                cooldown_secs = self.cooldown.as_secs(),
                "quota exhausted; placing credential on cooldown"
            );
            self.store
                .mark_cooling(&self.purpose, &credential, self.cooldown)
                .await?;
            self.rotate().await?;

            if attempt < max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(RouterError::QuotaRetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Snapshot the active client. The lock is never held across an await.
    fn current(&self) -> (Arc<dyn CompletionBackend>, Option<Credential>) {
        match &*self.active.lock() {
            Active::Primary { credential, client } => {
                (client.clone(), Some(credential.clone()))
            }
            Active::Fallback { client } => (client.clone(), None),
        }
    }

    async fn rotate(&self) -> Result<()> {
        let next = select_active(
            &self.pool,
            self.store.as_ref(),
            self.factory.as_ref(),
            &self.cycler,
            &self.purpose,
        )
        .await?;
        *self.active.lock() = next;
        Ok(())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("purpose", &self.purpose)
            .field("pool_size", &self.pool.len())
            .field("on_fallback", &self.on_fallback())
            .finish_non_exhaustive()
    }
}

async fn select_active(
    pool: &CredentialPool,
    store: &dyn CooldownStore,
    factory: &dyn ClientFactory,
    cycler: &CredentialCycler,
    purpose: &str,
) -> Result<Active> {
    match cycler.next_eligible(pool, store, purpose).await? {
        Selection::Credential(credential) => {
            debug!(
                credential = credential.fingerprint(),
                purpose, "binding primary client"
            );
            let client = factory.provider(&credential);
            Ok(Active::Primary { credential, client })
        }
        Selection::Exhausted => {
            warn!(purpose, "all primary credentials cooling; switching to fallback backend");
            let client = factory.fallback().await?;
            Ok(Active::Fallback { client })
        }
    }
}
