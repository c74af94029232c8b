//! keywheel — credential-rotating router for quota-metered LLM backends.
//!
//! A pool of independently quota-limited API credentials is presented to
//! callers as one reliable text-generation service. Cooldown state for
//! exhausted credentials lives in a shared Redis store so any number of
//! process instances stay in agreement; selection is round-robin over the
//! currently eligible subset; quota errors are classified at the client
//! edge and absorbed by bounded, jittered retries; and when the whole pool
//! is cooling, calls fail over to a self-hosted vLLM-style backend.
//!
//! ```no_run
//! use keywheel::{GenerateOptions, Router, RouterConfig};
//!
//! # async fn run() -> keywheel::Result<()> {
//! let config = RouterConfig::from_env("models/gemini-2.0-flash")?.with_purpose("text");
//! let router = Router::from_config(config).await?;
//!
//! let answer = router
//!     .complete("Write one quiz question about ownership in Rust.", &GenerateOptions::default())
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod pool;
pub mod router;
pub mod store;

pub use api::{ChatMessage, GenerateOptions, Role};
pub use client::{ClientFactory, CompletionBackend, GeminiClient, HttpClientFactory, VllmClient};
pub use config::{FallbackSettings, GeminiSettings, RouterConfig, DEFAULT_KEY_PREFIX};
pub use error::{CallError, CallErrorKind, Result, RouterError, StoreError};
pub use pool::{Credential, CredentialPool};
pub use router::{CredentialCycler, RetryPolicy, Router, RouterOptions, Selection};
pub use store::{CooldownStore, MemoryCooldownStore, RedisCooldownStore};
