//! Self-hosted vLLM fallback adapter.
//!
//! Used only when no primary credential is eligible. There is no credential
//! here and nothing to rotate, so errors are never retried by the router.

use crate::api::{ChatMessage, GenerateOptions, Role};
use crate::client::{excerpt, CompletionBackend};
use crate::config::FallbackSettings;
use crate::error::CallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Client for a vLLM-style `/v1/generate` endpoint.
#[derive(Debug, Clone)]
pub struct VllmClient {
    http: reqwest::Client,
    settings: FallbackSettings,
}

impl VllmClient {
    pub fn new(http: reqwest::Client, settings: FallbackSettings) -> Self {
        Self { http, settings }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/generate",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Cheap reachability check used at construction time. Any HTTP answer
    /// counts as reachable; only transport failures fail the probe.
    pub async fn probe(&self) -> Result<(), String> {
        self.http
            .get(&self.settings.base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                format!(
                    "fallback backend not reachable at {}: {e}",
                    self.settings.base_url
                )
            })
    }

    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String, CallError> {
        let request = GenerateRequest {
            prompt,
            max_tokens: opts.max_output_tokens.unwrap_or(self.settings.max_tokens),
            temperature: opts.temperature.unwrap_or(self.settings.temperature),
            stream: false,
        };

        let response = self
            .http
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::other(format!("request to fallback backend failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::other(format!("failed to read fallback response: {e}")))?;

        if !status.is_success() {
            return Err(CallError::other(format!(
                "fallback backend returned {}: {}",
                status,
                excerpt(&body)
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| CallError::other(format!("failed to parse fallback response: {e}")))?;
        parsed
            .text
            .into_iter()
            .next()
            .ok_or_else(|| CallError::other("fallback backend returned no text"))
    }
}

/// Flatten a conversation into a role-tagged transcript with a trailing
/// assistant cue, the usual shape for a bare completion endpoint.
fn flatten_transcript(messages: &[ChatMessage]) -> String {
    let mut transcript = String::new();
    for message in messages {
        let tag = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        transcript.push_str(tag);
        transcript.push_str(": ");
        transcript.push_str(&message.content);
        transcript.push('\n');
    }
    transcript.push_str("assistant:");
    transcript
}

#[async_trait]
impl CompletionBackend for VllmClient {
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String, CallError> {
        self.generate(prompt, opts).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> Result<String, CallError> {
        self.generate(&flatten_transcript(messages), opts).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: Vec<String>,
}
