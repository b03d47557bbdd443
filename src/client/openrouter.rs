//! OpenRouter (OpenAI-compatible) chat completion client.
//!
//! One request per call and no retries: a failed call is reported once and
//! the caller decides what to do with it.

use crate::models::{CartbotError, ConfigError, InterpretError, OpenRouterConfig, Result, truncate};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenRouter API client.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client.
    pub fn new(api_key: String, config: &OpenRouterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CartbotError::Network)?;

        if HeaderValue::from_str(&format!("Bearer {api_key}")).is_err() {
            return Err(ConfigError::InvalidApiKey.into());
        }

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build headers for a request.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        // validated in new()
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("X-Title", HeaderValue::from_static("cartbot"));
        headers
    }

    /// Send a chat request and return the text of the first choice.
    ///
    /// Failures are classified so the caller can tell them apart:
    /// transport, non-success status, and an envelope that is not a chat reply.
    pub async fn chat(&self, messages: &[Message]) -> std::result::Result<String, InterpretError> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| InterpretError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| InterpretError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(InterpretError::Status {
                status: status.as_u16(),
                body: raw,
            });
        }

        let content = extract_content(&raw)?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Interpreter replied"
        );
        Ok(content)
    }
}

/// Pull the first choice's text out of a chat completion body.
pub(crate) fn extract_content(raw: &str) -> std::result::Result<String, InterpretError> {
    let body: ChatCompletionResponse = serde_json::from_str(raw)
        .map_err(|_| InterpretError::NotStructured(truncate(raw, 500)))?;

    if let Some(usage) = &body.usage {
        debug!(
            model = body.model.as_deref().unwrap_or("?"),
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Interpreter usage"
        );
    }

    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| InterpretError::NotStructured(truncate(raw, 500)))
}
