use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::config::TtsConfig;
use crate::core::error::ApiError;
use crate::core::retry::{with_retry, RetryPolicy};

/// One text-to-speech call: a single script turn in one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
    pub voice: String,
    pub pitch: f32,
}

/// Speech collaborator. Returns base64-encoded audio.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, request: &SpeechRequest) -> Result<String, ApiError>;
}

pub struct TtsClient {
    client: Client,
    config: TtsConfig,
    retry: RetryPolicy,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> Self {
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

    fn body(&self, request: &SpeechRequest) -> serde_json::Value {
        json!({
            "inputs": [request.text],
            "target_language_code": request.language,
            "speaker": request.voice,
            "pitch": request.pitch,
            "pace": self.config.pace,
            "loudness": self.config.loudness,
            "speech_sample_rate": self.config.sample_rate,
            "enable_preprocessing": self.config.enable_preprocessing,
            "model": self.config.model,
        })
    }

    async fn send(&self, request: &SpeechRequest, api_key: &str) -> Result<String, ApiError> {
        let url = format!("{}/text-to-speech", self.config.api_url.trim_end_matches('/'));
        let body = self.body(request);

        log::info!(
            "Generating audio: speaker={} lang={} chars={}",
            request.voice,
            request.language,
            request.text.chars().count()
        );

        let res = self
            .client
            .post(&url)
            .header("api-subscription-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            if status.as_u16() != 429 {
                log::error!("TTS Error {}: {}", status, error_text);
            }
            return Err(ApiError::Status { status: status.as_u16(), body: error_text });
        }

        let response_json: serde_json::Value = res.json().await?;
        response_json["audios"][0]
            .as_str()
            .filter(|audio| !audio.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("No audio data received from TTS".to_string()))
    }
}

#[async_trait]
impl SpeechEngine for TtsClient {
    async fn speak(&self, request: &SpeechRequest) -> Result<String, ApiError> {
        let api_key = self.config.api_key()?;
        with_retry(&self.retry, "TTS", move || self.send(request, api_key)).await
    }
}
