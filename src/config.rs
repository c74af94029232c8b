//! Router configuration loaded from environment-style settings.

use crate::error::{Result, RouterError};
use crate::router::RetryPolicy;
use std::time::Duration;

/// Default env prefix under which credentials are discovered.
pub const DEFAULT_KEY_PREFIX: &str = "GEMINI_API_KEY";

const DEFAULT_PURPOSE: &str = "default";
const DEFAULT_REDIS_ADDR: &str = "localhost:6379";
const DEFAULT_COOLDOWN_SECONDS: u64 = 600;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_FALLBACK_URL: &str = "http://localhost:8800";
const DEFAULT_FALLBACK_MAX_TOKENS: u32 = 4096;
const DEFAULT_FALLBACK_TEMPERATURE: f32 = 0.6;

/// Connection settings for the primary provider.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API origin; overridable for tests.
    pub base_url: String,

    /// Model identifier, e.g. `models/gemini-2.0-flash`.
    pub model: String,

    /// Default sampling temperature.
    pub temperature: f32,
}

/// Connection settings for the self-hosted fallback backend.
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Everything a production router needs: where the credentials come from,
/// where cooldown state lives, and how both backends are reached.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Env prefix for credential discovery.
    pub key_prefix: String,

    /// Workload namespace for cooldown records, e.g. `"text"` or `"image"`.
    pub purpose: String,

    /// `host:port` of the shared cooldown store.
    pub redis_addr: String,

    /// TTL applied to a credential on quota exhaustion.
    pub cooldown_seconds: u64,

    /// Timeout carried by every outbound backend call.
    pub request_timeout: Duration,

    pub gemini: GeminiSettings,
    pub fallback: FallbackSettings,
    pub retry: RetryPolicy,
}

impl RouterConfig {
    /// Configuration with built-in defaults for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            purpose: DEFAULT_PURPOSE.to_string(),
            redis_addr: DEFAULT_REDIS_ADDR.to_string(),
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            gemini: GeminiSettings {
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                model: model.into(),
                temperature: DEFAULT_TEMPERATURE,
            },
            fallback: FallbackSettings {
                base_url: DEFAULT_FALLBACK_URL.to_string(),
                max_tokens: DEFAULT_FALLBACK_MAX_TOKENS,
                temperature: DEFAULT_FALLBACK_TEMPERATURE,
            },
            retry: RetryPolicy::default(),
        }
    }

    /// Load settings from the process environment, reading a `.env` file
    /// first when one is present.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(model, |name| std::env::var(name).ok())
    }

    /// Load settings from an arbitrary lookup, so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(model: impl Into<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(model);

        if let Some(value) = lookup("REDIS_URL") {
            config.redis_addr = value;
        }
        if let Some(value) = lookup("KEYWHEEL_PURPOSE") {
            config.purpose = value;
        }
        if let Some(value) = lookup("KEYWHEEL_COOLDOWN_SECONDS") {
            config.cooldown_seconds = parse_var("KEYWHEEL_COOLDOWN_SECONDS", &value)?;
        }
        if let Some(value) = lookup("KEYWHEEL_TEMPERATURE") {
            config.gemini.temperature = parse_var("KEYWHEEL_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("KEYWHEEL_FALLBACK_URL") {
            config.fallback.base_url = value;
        }
        if let Some(value) = lookup("KEYWHEEL_FALLBACK_MAX_TOKENS") {
            config.fallback.max_tokens = parse_var("KEYWHEEL_FALLBACK_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("KEYWHEEL_FALLBACK_TEMPERATURE") {
            config.fallback.temperature =
                parse_var("KEYWHEEL_FALLBACK_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("KEYWHEEL_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_var("KEYWHEEL_MAX_ATTEMPTS", &value)?;
        }

        Ok(config)
    }

    /// Set the credential discovery prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the cooldown namespace.
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// Set the cooldown TTL in seconds.
    pub fn with_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RouterError::Config(format!("invalid value for {name}: {value:?}")))
}
