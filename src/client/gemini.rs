//! Primary provider adapter for the Gemini `generateContent` API.
//!
//! A client is bound to exactly one credential at construction; the router
//! builds a fresh one each time it rotates.

use crate::api::{ChatMessage, GenerateOptions, Role};
use crate::client::{excerpt, is_quota_signal, CompletionBackend};
use crate::config::GeminiSettings;
use crate::error::CallError;
use crate::pool::Credential;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Client for the Gemini REST API, bound to a single credential.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
    credential: Credential,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        settings: GeminiSettings,
        credential: Credential,
    ) -> Self {
        Self {
            http,
            settings,
            credential,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model.trim_start_matches("models/"),
        )
    }

    fn generation_config(&self, opts: &GenerateOptions) -> GenerationConfig {
        GenerationConfig {
            temperature: opts.temperature.unwrap_or(self.settings.temperature),
            max_output_tokens: opts.max_output_tokens,
        }
    }

    async fn generate(&self, request: GenerateContentRequest) -> Result<String, CallError> {
        let response = self
            .http
            .post(self.url())
            .query(&[("key", self.credential.secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::other(format!("request to primary provider failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::other(format!("failed to read provider response: {e}")))?;

        if !status.is_success() {
            let message = format!("primary provider returned {}: {}", status, excerpt(&body));
            return if is_quota_signal(Some(status.as_u16()), &body) {
                Err(CallError::quota(message))
            } else {
                Err(CallError::other(message))
            };
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| CallError::other(format!("failed to parse provider response: {e}")))?;
        parsed
            .text()
            .ok_or_else(|| CallError::other("provider response contained no candidates"))
    }

    fn prompt_request(&self, prompt: &str, opts: &GenerateOptions) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: None,
            generation_config: self.generation_config(opts),
        }
    }

    fn chat_request(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> GenerateContentRequest {
        let mut system_lines = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                Role::System => system_lines.push(message.content.clone()),
                Role::User => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        text: message.content.clone(),
                    }],
                }),
                Role::Assistant => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: message.content.clone(),
                    }],
                }),
            }
        }

        let system_instruction = if system_lines.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_lines.join("\n"),
                }],
            })
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: self.generation_config(opts),
        }
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String, CallError> {
        self.generate(self.prompt_request(prompt, opts)).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> Result<String, CallError> {
        self.generate(self.chat_request(messages, opts)).await
    }
}

// Wire types for generateContent.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with parts concatenated. `None` when the
    /// response carried no usable candidate (safety block, empty response).
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(""),
        )
    }
}
