//! Backend adapters: the quota-metered primary provider and the self-hosted
//! fallback, plus the factory the router uses to rebuild its active client
//! as it rotates.

pub mod fallback;
pub mod gemini;

pub use fallback::VllmClient;
pub use gemini::GeminiClient;

use crate::api::{ChatMessage, GenerateOptions};
use crate::config::{FallbackSettings, GeminiSettings};
use crate::error::{CallError, RouterError};
use crate::pool::Credential;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One text-generation backend.
///
/// Implementations classify their own failures: quota signals come back as
/// [`CallErrorKind::QuotaExhausted`](crate::error::CallErrorKind) so the
/// router can rotate, everything else passes through untouched.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Single-turn text completion.
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String, CallError>;

    /// Multi-turn completion.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> Result<String, CallError>;
}

/// Builds the concrete clients the router binds to as it rotates.
///
/// The active credential is a call parameter here, never ambient process
/// state, so several routers with different purposes can share one process
/// without cross-talk.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// A primary client bound to one specific credential.
    fn provider(&self, credential: &Credential) -> Arc<dyn CompletionBackend>;

    /// The fallback client. Fails with
    /// [`RouterError::BackendUnreachable`] when the backend cannot be
    /// reached, which is fatal for the originating call.
    async fn fallback(&self) -> Result<Arc<dyn CompletionBackend>, RouterError>;
}

/// Detect a quota/rate-exhaustion signal in a provider response.
///
/// HTTP 429 always counts; otherwise the body is scanned for the provider's
/// structured status or a quota/rate-limit phrase, case-insensitively.
pub(crate) fn is_quota_signal(status: Option<u16>, body: &str) -> bool {
    if status == Some(429) {
        return true;
    }

    let lower = body.to_lowercase();
    lower.contains("resource_exhausted")
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("too many requests")
}

/// Cap on response bodies quoted into error messages.
const EXCERPT_LEN: usize = 500;

/// Leading slice of a response body, safe to embed in an error message.
pub(crate) fn excerpt(body: &str) -> &str {
    let mut end = body.len().min(EXCERPT_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Production factory: Gemini primary, vLLM fallback, one shared HTTP
/// connection pool.
pub struct HttpClientFactory {
    http: reqwest::Client,
    gemini: GeminiSettings,
    fallback: FallbackSettings,
}

impl HttpClientFactory {
    pub fn new(
        request_timeout: Duration,
        gemini: GeminiSettings,
        fallback: FallbackSettings,
    ) -> Result<Self, RouterError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| RouterError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            gemini,
            fallback,
        })
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    fn provider(&self, credential: &Credential) -> Arc<dyn CompletionBackend> {
        Arc::new(GeminiClient::new(
            self.http.clone(),
            self.gemini.clone(),
            credential.clone(),
        ))
    }

    async fn fallback(&self) -> Result<Arc<dyn CompletionBackend>, RouterError> {
        let client = VllmClient::new(self.http.clone(), self.fallback.clone());
        client
            .probe()
            .await
            .map_err(RouterError::BackendUnreachable)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_always_quota() {
        assert!(is_quota_signal(Some(429), ""));
    }

    #[test]
    fn test_structured_status_in_body() {
        assert!(is_quota_signal(
            Some(400),
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#
        ));
        assert!(is_quota_signal(None, "Quota exceeded for this project"));
        assert!(is_quota_signal(Some(403), "Rate limit reached"));
    }

    #[test]
    fn test_non_quota_errors_are_not_flagged() {
        assert!(!is_quota_signal(Some(400), "invalid argument: empty prompt"));
        assert!(!is_quota_signal(Some(500), "internal error"));
        assert!(!is_quota_signal(None, "connection reset by peer"));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "é".repeat(600);
        let cut = excerpt(&body);
        assert!(cut.len() <= EXCERPT_LEN);
        assert!(body.starts_with(cut));
    }
}
