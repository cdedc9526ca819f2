use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::core::config::LlmConfig;
use crate::core::error::ApiError;
use crate::core::retry::{with_retry, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn user(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Text of the last message, which is the prompt for single-turn requests.
    pub fn prompt(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }
}

/// Chat-completion collaborator.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;
}

pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send(&self, request: &ChatRequest, api_key: &str) -> Result<String, ApiError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));
        log::debug!("Sending LLM request to {}. Body: {}", url, body);

        let res = match self.client.post(&url).bearer_auth(api_key).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Failed to connect to LLM at {}: {}", url, e);
                return Err(ApiError::from(e));
            }
        };

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            if status.as_u16() != 429 {
                log::error!("LLM Error {}: {}", status, error_text);
            }
            return Err(ApiError::Status { status: status.as_u16(), body: error_text });
        }

        let response_json: serde_json::Value = res.json().await?;
        log::debug!("Received LLM response: {}", response_json);

        // OpenAI format: choices[0].message.content
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                log::warn!("Unexpected LLM response format: {:?}", response_json);
                ApiError::InvalidResponse("No content received from the language model".to_string())
            })?;

        Ok(strip_reasoning(content))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let api_key = self.config.api_key()?;
        with_retry(&self.retry, "LLM", move || self.send(request, api_key)).await
    }
}

/// Reasoning models may prefix their answer with a `<think>` block.
pub fn strip_reasoning(text: &str) -> String {
    match text.find("</think>") {
        Some(idx) => text[idx + "</think>".len()..].trim().to_string(),
        None => text.to_string(),
    }
}
