//! Chat model client.
//!
//! [`ChatClient`] is the seam between the generation engine and the
//! network: the engine hands it a rendered prompt and gets back the
//! model's raw text. [`OpenAiChatClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint; tests substitute scripted
//! implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::GenerateError;
use crate::prompt::RenderedPrompt;

/// Environment variable consulted when `llm.base_url` is not configured.
pub const BASE_URL_ENV: &str = "CHRONOGRAPH_BASE_URL";

/// A chat completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Invoke the model once with the rendered prompt and return its raw
    /// text response.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Invocation`] for network, auth, HTTP, and timeout
    /// failures. Never retried by the controller.
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, GenerateError>;
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Debug)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OpenAiChatClient {
    /// Build a client from configuration, resolving credentials from the
    /// environment.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Configuration`] if the API key or base URL is
    /// missing, or the HTTP client cannot be constructed. Raised before
    /// any generation attempt.
    pub fn new(config: &LlmConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GenerateError::Configuration(format!(
                "API key not found: set the {} environment variable",
                config.api_key_env
            ))
        })?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => std::env::var(BASE_URL_ENV).map_err(|_| {
                GenerateError::Configuration(format!(
                    "API base URL not found: set llm.base_url in the config or the {BASE_URL_ENV} \
                     environment variable"
                ))
            })?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, GenerateError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Invocation(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerateError::Invocation(format!(
                "chat API error {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerateError::Invocation(format!("chat response decode failed: {e}")))?;

        extract_message_content(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat completion response.
fn extract_message_content(json: &serde_json::Value) -> Result<String, GenerateError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            GenerateError::Invocation("chat response missing choices[0].message.content".to_string())
        })
}
